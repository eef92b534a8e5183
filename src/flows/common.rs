//! Shared flow inputs and the per-key single-flight registry.

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, DashboardId, Filter, PolicyDocument, UserId},
	store::EmbedKey,
};

/// Embed-token request as handed over by the identity layer.
#[derive(Clone, Debug)]
pub struct EmbedRequest {
	/// Authenticated portal user; `None` when the session carried no identity.
	pub user: Option<UserId>,
	/// Dashboard (or card) to embed.
	pub dashboard: DashboardId,
	/// Row-level filters in the order the identity layer stores them.
	pub filters: Vec<Filter>,
	/// Opaque PDP policies forwarded to the platform.
	pub policies: Vec<PolicyDocument>,
	/// Credential pair overriding the broker's configured one.
	pub credentials: Option<ClientCredentials>,
	/// Bypasses the embed-token store when true.
	pub force: bool,
	/// Value for the `referenceId` query parameter of the embed URL.
	pub reference_id: Option<String>,
}
impl EmbedRequest {
	/// Creates an unfiltered request for the user/dashboard pair.
	pub fn new(user: impl Into<Option<UserId>>, dashboard: DashboardId) -> Self {
		Self {
			user: user.into(),
			dashboard,
			filters: Vec::new(),
			policies: Vec::new(),
			credentials: None,
			force: false,
			reference_id: None,
		}
	}

	/// Replaces the row-level filters.
	pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
		self.filters = filters.into_iter().collect();

		self
	}

	/// Replaces the PDP policies.
	pub fn with_policies(mut self, policies: impl IntoIterator<Item = PolicyDocument>) -> Self {
		self.policies = policies.into_iter().collect();

		self
	}

	/// Uses `credentials` instead of the broker's configured pair.
	pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Forces a fresh mint even when a reusable record exists.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Attaches the reference id appended to embed URLs.
	pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
		self.reference_id = Some(reference_id.into());

		self
	}
}

type FlightMap = Arc<Mutex<HashMap<EmbedKey, Arc<AsyncMutex<()>>>>>;

/// Registry of per-key async locks serializing resolves for the same user/dashboard pair.
#[derive(Clone, Debug, Default)]
pub(crate) struct FlightRegistry(FlightMap);
impl FlightRegistry {
	/// Waits for exclusive ownership of `key`.
	pub(crate) async fn acquire(&self, key: &EmbedKey) -> FlightGuard {
		let lock = self
			.0
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();
		let guard = lock.lock_arc().await;

		FlightGuard { flights: self.0.clone(), key: key.clone(), guard: Some(guard) }
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.0.lock().len()
	}
}

/// Exclusive hold on one key; the registry entry is dropped once nobody holds or awaits it.
pub(crate) struct FlightGuard {
	flights: FlightMap,
	key: EmbedKey,
	guard: Option<MutexGuardArc<()>>,
}
impl Drop for FlightGuard {
	fn drop(&mut self) {
		self.guard.take();

		let mut flights = self.flights.lock();

		// Waiters clone the lock under the registry mutex, so a count of one means no waiters.
		if flights.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
			flights.remove(&self.key);
		}
	}
}
