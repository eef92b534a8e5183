//! Thread-safe in-memory [`EmbedTokenStore`] implementation for single-process portals and tests.

// self
use crate::{
	_prelude::*,
	auth::EmbedTokenRecord,
	store::{EmbedKey, EmbedTokenStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<EmbedKey, EmbedTokenRecord>>>;

/// Thread-safe storage backend that keeps records in-process.
///
/// Records do not survive a restart; use [`FileStore`](crate::store::FileStore) when a restart
/// must not force every user through a fresh mint.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of records currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no records are held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns the raw record for `key`, ignoring expiry.
	pub fn peek(&self, key: &EmbedKey) -> Option<EmbedTokenRecord> {
		self.0.read().get(key).cloned()
	}

	fn lookup_now(
		map: StoreMap,
		key: &EmbedKey,
		now: OffsetDateTime,
	) -> Option<EmbedTokenRecord> {
		{
			let guard = map.read();

			match guard.get(key) {
				Some(record) if !record.is_expired_at(now) => return Some(record.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut guard = map.write();

		// Re-check under the write lock; a concurrent put may have replaced the record.
		if guard.get(key).is_some_and(|record| record.is_expired_at(now)) {
			guard.remove(key);
		}

		guard.get(key).cloned()
	}

	fn purge_now(map: StoreMap, now: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, record| !record.is_expired_at(now));

		before - guard.len()
	}
}
impl EmbedTokenStore for MemoryStore {
	fn lookup<'a>(
		&'a self,
		key: &'a EmbedKey,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<EmbedTokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::lookup_now(map, key, now)) })
	}

	fn put(&self, record: EmbedTokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(EmbedKey::of(&record), record);

			Ok::<_, StoreError>(())
		})
	}

	fn remove<'a>(&'a self, key: &'a EmbedKey) -> StoreFuture<'a, Option<EmbedTokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(key)) })
	}

	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::purge_now(map, now)) })
	}
}
