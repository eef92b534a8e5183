//! Wire-level client for the analytics platform: the client-credential exchange and the
//! embed-token mint.
//!
//! Requests are assembled as plain [`HttpRequest`] values and executed through an
//! [`UpstreamHttpClient`] handle. Responses are parsed with `serde_path_to_error` so a payload
//! mismatch names the offending field.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientCredentials, DashboardId, FilterSet},
	error::{ConfigError, TransportError, UpstreamError},
	http::{ResponseMetadata, ResponseMetadataSlot, UpstreamHttpClient},
	platform::PlatformDescriptor,
};

/// Permissions requested for every embed authorization.
pub const EMBED_PERMISSIONS: [&str; 3] = ["READ", "FILTER", "EXPORT"];

const JSON: &str = "application/json";
const BODY_PREVIEW_LIMIT: usize = 256;

type UpstreamFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// The two upstream calls; decides which broker error a failure surfaces as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpstreamCall {
	/// Client-credential exchange for a platform access token.
	AccessToken,
	/// Embed-token mint for one dashboard.
	EmbedMint,
}
impl UpstreamCall {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "access_token",
			Self::EmbedMint => "embed_mint",
		}
	}

	/// Wraps an upstream failure into the broker error for this call.
	pub fn error(self, source: UpstreamError) -> Error {
		match self {
			Self::AccessToken => Error::UpstreamAuth(source),
			Self::EmbedMint => Error::UpstreamMint(source),
		}
	}
}
impl Display for UpstreamCall {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	fn map_transport_error(
		&self,
		call: UpstreamCall,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		call: UpstreamCall,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<ReqwestError>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(inner) => match metadata.and_then(|meta| meta.status) {
				// The status line arrived; the body read failed.
				Some(status) if !inner.is_timeout() => call.error(UpstreamError::Status {
					status,
					message: inner.to_string(),
					retry_after: metadata.and_then(|meta| meta.retry_after),
				}),
				_ => call.error(TransportError::from(*inner).into()),
			},
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => call.error(TransportError::Io(inner).into()),
			HttpClientError::Other(message) =>
				call.error(TransportError::network(OtherTransportError(message)).into()),
			_ => call.error(
				TransportError::network(OtherTransportError("unknown transport failure".into()))
					.into(),
			),
		}
	}
}

#[cfg(feature = "reqwest")]
#[derive(Debug, ThisError)]
#[error("{0}")]
struct OtherTransportError(String);

/// Successful client-credential exchange payload.
#[derive(Clone, Debug, Deserialize)]
struct ExchangeResponse {
	access_token: String,
	expires_in: i64,
	#[serde(default, rename = "userId")]
	user_id: Option<Value>,
}

/// Mint payload; the platform reports failures through `error` even on 2xx responses.
#[derive(Clone, Debug, Deserialize)]
struct MintResponse {
	#[serde(default)]
	authentication: Option<String>,
	#[serde(default)]
	error: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintBody<'a> {
	session_length: u32,
	authorizations: [MintAuthorization<'a>; 1],
}

#[derive(Serialize)]
struct MintAuthorization<'a> {
	token: &'a str,
	permissions: [&'static str; 3],
	filters: &'a [crate::auth::Filter],
	policies: &'a [crate::auth::PolicyDocument],
}

/// Issues the two platform calls over a pluggable transport.
pub(crate) struct UpstreamClient<'a, C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) http_client: &'a C,
	pub(crate) mapper: &'a M,
	pub(crate) descriptor: &'a PlatformDescriptor,
}
impl<'a, C, M> UpstreamClient<'a, C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges `credentials` for a platform access token.
	pub(crate) fn exchange<'b>(
		&'b self,
		credentials: &'b ClientCredentials,
	) -> UpstreamFuture<'b, AccessToken>
	where
		'a: 'b,
	{
		Box::pin(async move {
			const CALL: UpstreamCall = UpstreamCall::AccessToken;

			let request = exchange_request(self.descriptor, credentials)?;
			let response = self.send(CALL, request).await?;
			let issued_at = OffsetDateTime::now_utc();
			let payload = parse_exchange(&response).map_err(|e| CALL.error(e))?;

			let skew = self.descriptor.settings.safety_skew;

			access_token_from(payload, credentials, issued_at, skew).map_err(|e| CALL.error(e))
		})
	}

	/// Mints an embed token for `dashboard` under `filters`, returning the raw token.
	pub(crate) fn mint<'b>(
		&'b self,
		access: &'b AccessToken,
		dashboard: &'b DashboardId,
		filters: &'b FilterSet,
	) -> UpstreamFuture<'b, String>
	where
		'a: 'b,
	{
		Box::pin(async move {
			const CALL: UpstreamCall = UpstreamCall::EmbedMint;

			let request = mint_request(self.descriptor, access, dashboard, filters)?;
			let response = self.send(CALL, request).await?;

			parse_mint(&response).map_err(|e| CALL.error(e))
		})
	}

	async fn send(&self, call: UpstreamCall, request: HttpRequest) -> Result<HttpResponse> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());

		handle
			.call(request)
			.await
			.map_err(|e| self.mapper.map_transport_error(call, slot.take().as_ref(), e))
	}
}

/// Builds the client-credential exchange request (HTTP Basic auth, query-encoded grant).
pub(crate) fn exchange_request(
	descriptor: &PlatformDescriptor,
	credentials: &ClientCredentials,
) -> Result<HttpRequest, ConfigError> {
	Request::builder()
		.method(Method::POST)
		.uri(descriptor.access_token_url().as_str())
		.header(AUTHORIZATION, credentials.basic_authorization())
		.header(ACCEPT, JSON)
		.body(Vec::new())
		.map_err(ConfigError::from)
}

/// Builds the embed-token mint request (Bearer auth, JSON body).
pub(crate) fn mint_request(
	descriptor: &PlatformDescriptor,
	access: &AccessToken,
	dashboard: &DashboardId,
	filters: &FilterSet,
) -> Result<HttpRequest, ConfigError> {
	let body = MintBody {
		session_length: descriptor.settings.session_length_minutes,
		authorizations: [MintAuthorization {
			token: dashboard.as_str(),
			permissions: EMBED_PERMISSIONS,
			filters: filters.filters(),
			policies: filters.policies(),
		}],
	};
	let body = serde_json::to_vec(&body).map_err(ConfigError::Serialize)?;

	Request::builder()
		.method(Method::POST)
		.uri(descriptor.endpoints.embed_token.as_str())
		.header(AUTHORIZATION, access.bearer_authorization())
		.header(ACCEPT, JSON)
		.header(CONTENT_TYPE, JSON)
		.body(body)
		.map_err(ConfigError::from)
}

fn parse_exchange(response: &HttpResponse) -> Result<ExchangeResponse, UpstreamError> {
	ensure_success(response)?;

	let payload = parse_json::<ExchangeResponse>(response)?;

	if payload.access_token.is_empty() {
		return Err(UpstreamError::InvalidPayload { reason: "access_token is empty".into() });
	}
	if payload.expires_in <= 0 {
		return Err(UpstreamError::InvalidPayload {
			reason: format!("expires_in must be positive, got {}", payload.expires_in),
		});
	}

	Ok(payload)
}

fn access_token_from(
	payload: ExchangeResponse,
	credentials: &ClientCredentials,
	issued_at: OffsetDateTime,
	skew: Duration,
) -> Result<AccessToken, UpstreamError> {
	let expires_in = payload.expires_in;
	let token = AccessToken::from_exchange(
		payload.access_token,
		credentials,
		issued_at,
		Duration::seconds(expires_in),
		skew,
	)
	.ok_or_else(|| UpstreamError::InvalidPayload {
		reason: format!("expires_in {expires_in} is out of range"),
	})?;

	Ok(token.with_platform_user(payload.user_id.map(value_label)))
}

fn parse_mint(response: &HttpResponse) -> Result<String, UpstreamError> {
	ensure_success(response)?;

	let payload = parse_json::<MintResponse>(response)?;

	if let Some(error) = payload.error.filter(|error| !error.is_null()) {
		return Err(UpstreamError::Rejected { message: value_label(error) });
	}

	match payload.authentication {
		Some(token) if !token.is_empty() => Ok(token),
		_ => Err(UpstreamError::InvalidPayload { reason: "authentication is missing".into() }),
	}
}

fn ensure_success(response: &HttpResponse) -> Result<(), UpstreamError> {
	let status = response.status();

	if status.is_success() {
		return Ok(());
	}

	Err(UpstreamError::Status {
		status: status.as_u16(),
		message: body_message(response.body()),
		retry_after: None,
	})
}

fn parse_json<T>(response: &HttpResponse) -> Result<T, UpstreamError>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| UpstreamError::Parse {
		source,
		status: Some(response.status().as_u16()),
	})
}

/// Prefers the platform's `message`/`error` fields; falls back to a truncated body preview.
fn body_message(body: &[u8]) -> String {
	if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
		for field in ["message", "error_description", "error", "statusReason"] {
			if let Some(value) = map.get(field).filter(|value| !value.is_null()) {
				return value_label(value.clone());
			}
		}
	}

	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return "empty body".into();
	}

	text.chars().take(BODY_PREVIEW_LIMIT).collect()
}

fn value_label(value: Value) -> String {
	match value {
		Value::String(text) => text,
		other => other.to_string(),
	}
}
