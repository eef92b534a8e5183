//! Platform access token produced by the client-credential exchange.

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret},
};

/// Bearer token authorizing embed-token mint calls.
///
/// Lives only in memory; the broker keeps at most one per credential fingerprint.
#[derive(Clone)]
pub struct AccessToken {
	/// Bearer value.
	pub value: TokenSecret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Upstream expiry minus the safety skew.
	pub expires_at: OffsetDateTime,
	/// Fingerprint of the credential pair that produced the token.
	pub credential_fingerprint: String,
	/// Platform user the credential pair acts as, when reported.
	pub platform_user: Option<String>,
}
impl AccessToken {
	/// Builds a token from exchange results; `expires_in` is shortened by `skew`.
	///
	/// Returns `None` when the skewed expiry falls outside the representable range.
	pub fn from_exchange(
		value: impl Into<String>,
		credentials: &ClientCredentials,
		issued_at: OffsetDateTime,
		expires_in: Duration,
		skew: Duration,
	) -> Option<Self> {
		let expires_at = issued_at.checked_add(expires_in)?.checked_sub(skew)?;

		Some(Self {
			value: TokenSecret::new(value),
			issued_at,
			expires_at,
			credential_fingerprint: credentials.fingerprint().to_owned(),
			platform_user: None,
		})
	}

	/// Attaches the platform user reported by the exchange.
	pub fn with_platform_user(mut self, user: Option<String>) -> Self {
		self.platform_user = user;

		self
	}

	/// Returns `true` while `instant` is before the skewed expiry.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Returns `true` if the token was produced by `credentials`.
	pub fn issued_for(&self, credentials: &ClientCredentials) -> bool {
		self.credential_fingerprint == credentials.fingerprint()
	}

	/// Value of the `Authorization` header for mint calls.
	pub fn bearer_authorization(&self) -> String {
		format!("Bearer {}", self.value.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("platform_user", &self.platform_user)
			.finish()
	}
}
