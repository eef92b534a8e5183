//! Identity-provider settings for edit links.

// self
use crate::{
	_prelude::*,
	auth::{RESERVED_EDIT_CLAIMS, TokenSecret, credentials},
	error::ConfigError,
	platform::{PlatformDescriptorError, builder},
};

/// Environment variable holding the identity provider's base URL.
pub const IDP_URL_ENV: &str = "IDP_URL";
/// Environment variable naming the claim that carries the user's mapping value.
pub const KEY_ATTRIBUTE_ENV: &str = "KEY_ATTRIBUTE";
/// Environment variable holding the HS256 secret shared with the identity provider.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Errors raised while validating an [`EditLinkConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum EditLinkError {
	/// The identity provider URL failed endpoint validation.
	#[error(transparent)]
	Endpoint(#[from] PlatformDescriptorError),
	/// The identity provider URL has no path to append `/jwt` to.
	#[error("Identity provider URL cannot carry a path: {url}.")]
	OpaqueUrl {
		/// Rejected URL.
		url: String,
	},
	/// The key attribute is empty or collides with a fixed claim.
	#[error("Key attribute `{name}` is empty or shadows a reserved claim.")]
	InvalidKeyAttribute {
		/// Rejected attribute name.
		name: String,
	},
	/// The signing secret is empty.
	#[error("Edit token secret is empty.")]
	EmptySecret,
	/// Edit tokens must live at least one second.
	#[error("Edit token lifetime must be positive.")]
	NonPositiveTtl,
}

/// Where and how edit tokens are issued.
#[derive(Clone, Debug)]
pub struct EditLinkConfig {
	idp_url: Url,
	key_attribute: String,
	secret: TokenSecret,
	ttl: Duration,
}
impl EditLinkConfig {
	/// Lifetime of an edit token.
	pub const DEFAULT_TTL: Duration = Duration::minutes(5);

	/// Validates and creates a configuration with the default lifetime.
	pub fn new(
		idp_url: Url,
		key_attribute: impl Into<String>,
		secret: impl Into<String>,
	) -> Result<Self, EditLinkError> {
		let key_attribute = key_attribute.into();
		let secret = TokenSecret::new(secret);

		builder::validate_endpoint("idp", &idp_url)?;

		if idp_url.cannot_be_a_base() {
			return Err(EditLinkError::OpaqueUrl { url: idp_url.to_string() });
		}
		if key_attribute.trim().is_empty() || RESERVED_EDIT_CLAIMS.contains(&key_attribute.as_str())
		{
			return Err(EditLinkError::InvalidKeyAttribute { name: key_attribute });
		}
		if secret.is_empty() {
			return Err(EditLinkError::EmptySecret);
		}

		Ok(Self { idp_url, key_attribute, secret, ttl: Self::DEFAULT_TTL })
	}

	/// Reads `IDP_URL`, `KEY_ATTRIBUTE`, and `JWT_SECRET`.
	pub fn from_env() -> Result<Self, ConfigError> {
		let raw = credentials::read_env(IDP_URL_ENV)?;
		let idp_url = Url::parse(&raw).map_err(|e| {
			EditLinkError::from(PlatformDescriptorError::InvalidUrl {
				endpoint: "idp",
				reason: e.to_string(),
			})
		})?;

		let key_attribute = credentials::read_env(KEY_ATTRIBUTE_ENV)?;
		let secret = credentials::read_env(JWT_SECRET_ENV)?;

		Ok(Self::new(idp_url, key_attribute, secret)?)
	}

	/// Overrides the token lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Result<Self, EditLinkError> {
		if !ttl.is_positive() {
			return Err(EditLinkError::NonPositiveTtl);
		}

		self.ttl = ttl;

		Ok(self)
	}

	/// Identity provider base URL.
	pub fn idp_url(&self) -> &Url {
		&self.idp_url
	}

	/// Claim name carrying the mapping value.
	pub fn key_attribute(&self) -> &str {
		&self.key_attribute
	}

	/// HS256 signing secret.
	pub fn secret(&self) -> &TokenSecret {
		&self.secret
	}

	/// Token lifetime.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// `{idp_url}/jwt?token={token}`.
	pub fn link_for(&self, token: &TokenSecret) -> Url {
		let mut url = self.idp_url.clone();

		if let Ok(mut segments) = url.path_segments_mut() {
			segments.pop_if_empty().push("jwt");
		}

		url.set_query(None);
		url.query_pairs_mut().append_pair("token", token.expose());

		url
	}
}
