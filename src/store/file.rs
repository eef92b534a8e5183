//! File-backed [`EmbedTokenStore`] so minted embed tokens survive a portal restart.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::EmbedTokenRecord,
	store::{EmbedKey, EmbedTokenStore, StoreError, StoreFuture},
};

/// Persists embed-token records to a JSON file after each mutation.
///
/// Snapshots are written to a sibling temp file, synced, then renamed over the target, so a
/// crash leaves either the old or the new snapshot in place.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<EmbedKey, EmbedTokenRecord>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<EmbedKey, EmbedTokenRecord>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let records: Vec<EmbedTokenRecord> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(records.into_iter().map(|record| (EmbedKey::of(&record), record)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(
		&self,
		contents: &HashMap<EmbedKey, EmbedTokenRecord>,
	) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut snapshot = contents.values().collect::<Vec<_>>();

		snapshot.sort_by(|a, b| (&a.user, &a.dashboard).cmp(&(&b.user, &b.dashboard)));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl EmbedTokenStore for FileStore {
	fn lookup<'a>(
		&'a self,
		key: &'a EmbedKey,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<EmbedTokenRecord>> {
		Box::pin(async move {
			{
				let guard = self.inner.read();

				match guard.get(key) {
					Some(record) if !record.is_expired_at(now) => return Ok(Some(record.clone())),
					Some(_) => {},
					None => return Ok(None),
				}
			}

			let mut guard = self.inner.write();

			match guard.get(key) {
				Some(record) if record.is_expired_at(now) => {},
				other => return Ok(other.cloned()),
			}

			if let Some(expired) = guard.remove(key) {
				// Eviction is best effort; the snapshot still holds the record, so memory does too.
				if self.persist_locked(&guard).is_err() {
					guard.insert(key.clone(), expired);
				}
			}

			Ok(None)
		})
	}

	fn put(&self, record: EmbedTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let key = EmbedKey::of(&record);
			let mut guard = self.inner.write();
			let previous = guard.insert(key.clone(), record);

			// Roll back so memory never runs ahead of the snapshot.
			if let Err(e) = self.persist_locked(&guard) {
				match previous {
					Some(previous) => guard.insert(key, previous),
					None => guard.remove(&key),
				};

				return Err(e);
			}

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a EmbedKey) -> StoreFuture<'a, Option<EmbedTokenRecord>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let Some(removed) = guard.remove(key) else {
				return Ok(None);
			};

			if let Err(e) = self.persist_locked(&guard) {
				guard.insert(key.clone(), removed);

				return Err(e);
			}

			Ok(Some(removed))
		})
	}

	fn purge_expired(&self, now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let expired = guard
				.iter()
				.filter(|(_, record)| record.is_expired_at(now))
				.map(|(key, _)| key.clone())
				.collect::<Vec<_>>();

			if expired.is_empty() {
				return Ok(0);
			}

			let purged =
				expired.iter().filter_map(|key| guard.remove_entry(key)).collect::<Vec<_>>();

			if let Err(e) = self.persist_locked(&guard) {
				guard.extend(purged);

				return Err(e);
			}

			Ok(purged.len())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::{DashboardId, UserId};

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"embed_broker_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_record(dashboard: &str, expires_at: OffsetDateTime) -> EmbedTokenRecord {
		EmbedTokenRecord::builder(
			UserId::new("user-demo").expect("Failed to build user fixture."),
			DashboardId::new(dashboard).expect("Failed to build dashboard fixture."),
		)
		.token(format!("embed-{dashboard}"))
		.filter_fingerprint("fp-demo")
		.expires_at(expires_at)
		.build()
		.expect("Failed to build file-store test record.")
	}

	#[test]
	fn put_and_reload_round_trip() {
		let path = temp_path("reload");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let now = OffsetDateTime::now_utc();
		let record = build_record("d1", now + Duration::hours(1));
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.put(record.clone())).expect("Failed to save fixture record.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.lookup(&EmbedKey::of(&record), now))
			.expect("Failed to fetch fixture record from file store.")
			.expect("File store lost record after reopen.");

		assert_eq!(fetched.token.expose(), record.token.expose());
		assert_eq!(fetched.filter_fingerprint, record.filter_fingerprint);
		assert_eq!(fetched.expires_at, record.expires_at);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn eviction_and_purge_are_persisted() {
		let path = temp_path("purge");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let now = OffsetDateTime::now_utc();
		let expired = build_record("d1", now - Duration::minutes(1));
		let also_expired = build_record("d2", now - Duration::minutes(1));
		let live = build_record("d3", now + Duration::hours(1));
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		for record in [expired.clone(), also_expired, live.clone()] {
			rt.block_on(store.put(record)).expect("Failed to save fixture record.");
		}

		assert!(
			rt.block_on(store.lookup(&EmbedKey::of(&expired), now))
				.expect("Lookup should succeed.")
				.is_none()
		);
		assert_eq!(rt.block_on(store.purge_expired(now)).expect("Purge should succeed."), 1);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(reopened.inner.read().len(), 1);
		assert!(reopened.inner.read().contains_key(&EmbedKey::of(&live)));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_writes_leave_memory_matching_the_snapshot() {
		let path = temp_path("rollback");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let now = OffsetDateTime::now_utc();
		let live = build_record("d1", now + Duration::hours(1));
		let expired = build_record("d2", now - Duration::minutes(1));
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		for record in [live.clone(), expired.clone()] {
			rt.block_on(store.put(record)).expect("Failed to save fixture record.");
		}

		// A directory in the temp file's place makes every snapshot write fail.
		let blocker = path.with_extension("tmp");

		fs::create_dir(&blocker).expect("Failed to create snapshot blocker directory.");

		let live_key = EmbedKey::of(&live);
		let expired_key = EmbedKey::of(&expired);

		assert!(rt.block_on(store.remove(&live_key)).is_err());
		assert!(
			rt.block_on(store.remove(&live_key)).is_err(),
			"A failed remove must not drop the record from memory."
		);
		assert!(store.inner.read().contains_key(&live_key));
		assert!(
			rt.block_on(store.lookup(&expired_key, now))
				.expect("Expired lookup should not surface the eviction failure.")
				.is_none()
		);
		assert!(store.inner.read().contains_key(&expired_key));
		assert!(rt.block_on(store.purge_expired(now)).is_err());
		assert_eq!(store.inner.read().len(), 2);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert_eq!(reopened.inner.read().len(), 2);

		fs::remove_dir(&blocker).unwrap_or_else(|e| {
			panic!("Failed to remove snapshot blocker {}: {e}", blocker.display())
		});

		assert_eq!(rt.block_on(store.purge_expired(now)).expect("Purge should succeed."), 1);
		assert!(rt.block_on(store.remove(&live_key)).expect("Remove should succeed.").is_some());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
