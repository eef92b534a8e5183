//! Access-token, embed-token, and edit-token models.

pub mod access;
pub mod claims;
pub mod edit;
pub mod embed;
