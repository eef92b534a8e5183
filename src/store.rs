//! Storage contracts and built-in store implementations for embed-token records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{DashboardId, EmbedTokenRecord, UserId},
};

/// Boxed future returned by [`EmbedTokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable per-user, per-dashboard embed-token storage.
///
/// Implementations hold at most one record per [`EmbedKey`]. A successful
/// [`put`](EmbedTokenStore::put) must be durable before it resolves, and expired records must
/// never be returned from [`lookup`](EmbedTokenStore::lookup).
pub trait EmbedTokenStore
where
	Self: Send + Sync,
{
	/// Returns the record for `key` if it has not expired at `now`; expired records are evicted.
	fn lookup<'a>(
		&'a self,
		key: &'a EmbedKey,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<EmbedTokenRecord>>;

	/// Inserts or replaces the record for its key.
	fn put(&self, record: EmbedTokenRecord) -> StoreFuture<'_, ()>;

	/// Deletes the record for `key`, returning it when present.
	fn remove<'a>(&'a self, key: &'a EmbedKey) -> StoreFuture<'a, Option<EmbedTokenRecord>>;

	/// Deletes every record expired at `now` and returns how many were dropped.
	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize>;
}

/// Error type produced by [`EmbedTokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Records could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Unique key identifying a stored embed-token record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmbedKey {
	/// Portal user component.
	pub user: UserId,
	/// Dashboard component.
	pub dashboard: DashboardId,
}
impl EmbedKey {
	/// Builds a key for the user/dashboard pair.
	pub fn new(user: UserId, dashboard: DashboardId) -> Self {
		Self { user, dashboard }
	}

	/// Returns the key a record is stored under.
	pub fn of(record: &EmbedTokenRecord) -> Self {
		Self::new(record.user.clone(), record.dashboard.clone())
	}
}
impl Display for EmbedKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.user, self.dashboard)
	}
}
