//! Auth-domain identifiers, credentials, filters, and token models.

pub mod credentials;
pub mod filter;
pub mod id;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use filter::*;
pub use id::*;
pub use secret::*;
pub use token::{access::*, claims::*, edit::*, embed::*};
