//! Broker-level error types shared across flows, the upstream adapter, and stores.

// self
use crate::{_prelude::*, auth::DashboardId};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The request carried no authenticated user; nothing was looked up or minted.
	#[error("No authenticated user is attached to the embed request.")]
	MissingUserContext,
	/// The client-credential exchange for a platform access token failed.
	#[error("Access token exchange failed: {0}")]
	UpstreamAuth(#[source] UpstreamError),
	/// The embed-token mint call failed or returned an explicit error payload.
	#[error("Embed token mint failed: {0}")]
	UpstreamMint(#[source] UpstreamError),
	/// The minted token carries an empty `emb` grant.
	#[error(
		"The emb claim of the embed token for dashboard `{dashboard}` is empty. The identity behind \
		 the configured client id/secret most likely has no access to this dashboard."
	)]
	EmptyAuthorization {
		/// Dashboard the token was minted for.
		dashboard: DashboardId,
	},
}
impl Error {
	/// Returns the coarse classification boundary layers map onto transport responses.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Storage(_) => ErrorKind::Persistence,
			Self::Config(_) => ErrorKind::Configuration,
			Self::MissingUserContext => ErrorKind::Unauthenticated,
			Self::UpstreamAuth(_) => ErrorKind::UpstreamAuth,
			Self::UpstreamMint(_) => ErrorKind::UpstreamMint,
			Self::EmptyAuthorization { .. } => ErrorKind::EmptyAuthorization,
		}
	}
}

/// Stable error classes for boundary layers (HTTP handlers, RPC adapters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Store read or write failed.
	Persistence,
	/// Broker is misconfigured.
	Configuration,
	/// No authenticated user.
	Unauthenticated,
	/// Access token exchange failed.
	UpstreamAuth,
	/// Embed token mint failed.
	UpstreamMint,
	/// Issuing identity holds no grant for the dashboard.
	EmptyAuthorization,
}
impl ErrorKind {
	/// Returns a stable label suitable for logs or response bodies.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Persistence => "persistence",
			Self::Configuration => "configuration",
			Self::Unauthenticated => "unauthenticated",
			Self::UpstreamAuth => "upstream_auth",
			Self::UpstreamMint => "upstream_mint",
			Self::EmptyAuthorization => "empty_authorization",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Platform descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::platform::PlatformDescriptorError),
	/// Neither the request nor the broker carries client credentials.
	#[error("No client credentials are configured for the platform.")]
	MissingCredentials,
	/// Filters or policies attached to an embed request are invalid.
	#[error(transparent)]
	InvalidFilters(#[from] crate::auth::FilterError),
	/// A required environment variable is absent or empty.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// A request body could not be serialized.
	#[error("Failed to serialize the upstream request body.")]
	Serialize(#[source] serde_json::Error),
	/// Edit-link settings failed validation.
	#[error(transparent)]
	InvalidEditLink(#[from] crate::platform::EditLinkError),
	/// An edit link was requested but the broker has no identity-provider settings.
	#[error("No identity provider is configured for edit links.")]
	MissingEditLink,
	/// The edit token could not be signed.
	#[error("Failed to sign the edit token.")]
	EditTokenSign(#[source] jsonwebtoken::errors::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures talking to the analytics platform, shared by the exchange and mint calls.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Network, TLS, IO, or timeout failure before a response was read.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a non-success status code.
	#[error("Upstream responded with HTTP {status}: {message}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Upstream error message or body preview.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Upstream reported an explicit `error` field.
	#[error("Upstream rejected the request: {message}.")]
	Rejected {
		/// Upstream-supplied message.
		message: String,
	},
	/// Upstream returned JSON that does not match the expected shape.
	#[error("Upstream returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The minted embed token could not be decoded.
	#[error(transparent)]
	MalformedToken(#[from] crate::auth::ClaimsError),
	/// Upstream returned a well-formed body whose values are unusable.
	#[error("Upstream returned an invalid payload: {reason}.")]
	InvalidPayload {
		/// What was wrong with the payload.
		reason: String,
	},
}
impl UpstreamError {
	/// Returns `true` for failures raised before any HTTP response was read.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	/// Returns the HTTP status attached to the failure, when known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::Parse { status, .. } => *status,
			_ => None,
		}
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the platform.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within the configured timeout.
	#[error("Request to the platform timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the platform.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
