//! Broker orchestration: access-token acquisition, embed-token resolution, and edit links.

pub mod common;
pub mod edit;
pub mod embed;
pub mod metrics;

mod access_token;

pub use common::*;
pub use edit::*;
pub use embed::*;
pub use metrics::*;

// self
use crate::{
	_prelude::*,
	auth::ClientCredentials,
	cache::AccessTokenCache,
	http::UpstreamHttpClient,
	platform::{EditLinkConfig, PlatformDescriptor},
	store::EmbedTokenStore,
	upstream::{TransportErrorMapper, UpstreamClient},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	http::ReqwestHttpClient,
	platform::IDP_URL_ENV,
	upstream::ReqwestTransportErrorMapper,
};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Issues embed tokens for one analytics platform.
///
/// The broker owns the transport, the embed-token store, the platform descriptor, and the
/// configured credential pair. Clones share the access-token cache, the single-flight registry,
/// and the metrics, so one broker can be cloned into every request handler.
#[derive(Clone)]
pub struct Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound platform request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Durable embed-token store.
	pub store: Arc<dyn EmbedTokenStore>,
	/// Platform endpoints and deployment settings.
	pub descriptor: PlatformDescriptor,
	/// Credential pair used when a request carries none.
	pub credentials: Option<ClientCredentials>,
	/// Shared counters for broker outcomes.
	pub metrics: Arc<BrokerMetrics>,
	edit_link: Option<Arc<EditLinkConfig>>,
	access_tokens: Arc<AccessTokenCache>,
	flights: FlightRegistry,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn EmbedTokenStore>,
		descriptor: PlatformDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			credentials: None,
			metrics: Default::default(),
			edit_link: None,
			access_tokens: Default::default(),
			flights: Default::default(),
		}
	}

	/// Sets or replaces the default credential pair.
	pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Drops the cached platform access token so the next mint re-exchanges credentials.
	pub fn invalidate_access_token(&self) {
		self.access_tokens.invalidate();
	}

	fn upstream(&self) -> UpstreamClient<'_, C, M> {
		UpstreamClient {
			http_client: self.http_client.as_ref(),
			mapper: self.transport_mapper.as_ref(),
			descriptor: &self.descriptor,
		}
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker with its own reqwest transport bounded by the descriptor's timeout.
	///
	/// Attach credentials with [`Broker::with_credentials`] or pass them per request.
	pub fn new(store: Arc<dyn EmbedTokenStore>, descriptor: PlatformDescriptor) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(descriptor.settings.request_timeout)?;

		Ok(Self::with_http_client(store, descriptor, http_client, ReqwestTransportErrorMapper))
	}

	/// Creates a broker for the hosted platform configured from the process environment
	/// (`EMBED_TYPE`, `USE_XHR`, `DOMO_CLIENT_ID`, `DOMO_CLIENT_SECRET`).
	///
	/// Edit links are enabled when `IDP_URL` is set, which then requires `KEY_ATTRIBUTE` and
	/// `JWT_SECRET` as well.
	pub fn from_env(store: Arc<dyn EmbedTokenStore>) -> Result<Self> {
		let descriptor = PlatformDescriptor::from_env().map_err(ConfigError::from)?;
		let credentials = ClientCredentials::from_env()?;
		let broker = Self::new(store, descriptor)?.with_credentials(credentials);

		if std::env::var(IDP_URL_ENV).is_ok_and(|value| !value.trim().is_empty()) {
			return Ok(broker.with_edit_link(EditLinkConfig::from_env()?));
		}

		Ok(broker)
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("credentials", &self.credentials)
			.field("edit_link", &self.edit_link)
			.finish()
	}
}
