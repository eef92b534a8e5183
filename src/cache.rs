//! In-memory slot holding the platform access token for the active credential pair.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientCredentials},
};

/// Process-local cache for the single platform access token.
///
/// The slot is keyed implicitly by the credential fingerprint stored on the token: a lookup with
/// a different credential pair discards the cached value. The separate refresh lock lets
/// concurrent callers wait for one exchange instead of issuing their own.
#[derive(Debug, Default)]
pub struct AccessTokenCache {
	slot: Mutex<Option<AccessToken>>,
	refresh: AsyncMutex<()>,
}
impl AccessTokenCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached token when it was issued for `credentials` and is still valid at `now`.
	///
	/// A token issued for other credentials is dropped; an expired token is left in place until
	/// the next [`put`](Self::put) replaces it.
	pub fn get(&self, credentials: &ClientCredentials, now: OffsetDateTime) -> Option<AccessToken> {
		let mut slot = self.slot.lock();

		match slot.as_ref() {
			Some(token) if !token.issued_for(credentials) => {
				*slot = None;

				None
			},
			Some(token) if token.is_valid_at(now) => Some(token.clone()),
			_ => None,
		}
	}

	/// Replaces the cached token.
	pub fn put(&self, token: AccessToken) {
		*self.slot.lock() = Some(token);
	}

	/// Empties the cache so the next lookup triggers an exchange.
	pub fn invalidate(&self) {
		self.slot.lock().take();
	}

	/// Serializes exchanges; hold the guard while checking the slot and refreshing it.
	pub(crate) async fn refresh_guard(&self) -> async_lock::MutexGuard<'_, ()> {
		self.refresh.lock().await
	}
}
