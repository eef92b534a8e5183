//! Short-lived HS256 tokens handing a portal user over to the platform's identity provider.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use uuid::Uuid;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Role granted to every edit session.
pub const EDIT_ROLE: &str = "Admin";

/// Claim names the edit token always sets; the mapping attribute may not shadow them.
pub const RESERVED_EDIT_CLAIMS: &[&str] = &["sub", "name", "role", "email", "jti", "iat", "exp"];

/// Row-level mapping value carried under the configured key attribute.
///
/// A stored value containing commas becomes a list of trimmed entries; anything else is passed
/// through as one string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingValue {
	/// Single value, forwarded verbatim.
	Single(String),
	/// Comma-separated value split into trimmed entries.
	List(Vec<String>),
}
impl MappingValue {
	/// Interprets a stored mapping value.
	pub fn parse(raw: impl Into<String>) -> Self {
		let raw = raw.into();

		if raw.contains(',') {
			Self::List(raw.split(',').map(|item| item.trim().to_owned()).collect())
		} else {
			Self::Single(raw)
		}
	}
}
impl From<&str> for MappingValue {
	fn from(value: &str) -> Self {
		Self::parse(value)
	}
}
impl From<String> for MappingValue {
	fn from(value: String) -> Self {
		Self::parse(value)
	}
}

/// Claim set of an edit token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditClaims {
	/// Portal username.
	pub sub: String,
	/// Display name; the portal uses the username.
	pub name: String,
	/// Always [`EDIT_ROLE`].
	pub role: String,
	/// Email of the portal user.
	pub email: String,
	/// Random v4 UUID so every link is single-use on the provider side.
	pub jti: String,
	/// Issue time, seconds since the epoch.
	pub iat: i64,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
	/// Mapping attribute keyed by its configured claim name.
	#[serde(flatten)]
	pub attributes: BTreeMap<String, MappingValue>,
}
impl EditClaims {
	/// Builds claims for `username` valid for `ttl` from `issued_at`.
	///
	/// The mapping value is attached under `key_attribute` only when present.
	pub fn new(
		username: &str,
		email: impl Into<String>,
		key_attribute: &str,
		mapping_value: Option<MappingValue>,
		issued_at: OffsetDateTime,
		ttl: Duration,
	) -> Self {
		let iat = issued_at.unix_timestamp();
		let attributes = mapping_value
			.map(|value| BTreeMap::from([(key_attribute.to_owned(), value)]))
			.unwrap_or_default();

		Self {
			sub: username.to_owned(),
			name: username.to_owned(),
			role: EDIT_ROLE.to_owned(),
			email: email.into(),
			jti: Uuid::new_v4().to_string(),
			iat,
			exp: iat.saturating_add(ttl.whole_seconds()),
			attributes,
		}
	}

	/// Signs the claims with HS256.
	pub fn sign(&self, secret: &TokenSecret) -> Result<TokenSecret, jsonwebtoken::errors::Error> {
		let key = EncodingKey::from_secret(secret.expose().as_bytes());

		jsonwebtoken::encode(&Header::new(Algorithm::HS256), self, &key).map(TokenSecret::new)
	}
}
