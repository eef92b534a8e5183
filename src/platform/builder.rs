// self
use crate::{
	_prelude::*,
	platform::{EmbedKind, EmbedSettings, PlatformDescriptor, PlatformEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PlatformDescriptorError {
	/// Neither an explicit endpoint nor a host to derive it from was configured.
	#[error("Missing {endpoint} endpoint.")]
	MissingEndpoint {
		/// Which endpoint is missing.
		endpoint: &'static str,
	},
	/// An endpoint could not be derived from its host.
	#[error("The {endpoint} endpoint is not a valid URL: {reason}.")]
	InvalidUrl {
		/// Which endpoint failed.
		endpoint: &'static str,
		/// Parser message.
		reason: String,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The session length must be at least one minute.
	#[error("Embed session length must be positive.")]
	NonPositiveSessionLength,
	/// The safety skew cannot be negative.
	#[error("Safety skew cannot be negative.")]
	NegativeSkew,
	/// The request timeout must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
}

/// Builder for [`PlatformDescriptor`] values.
///
/// Endpoints can be set explicitly or derived from the API and embed hosts plus the
/// [`EmbedKind`] paths; explicit values win.
#[derive(Clone, Debug, Default)]
pub struct PlatformDescriptorBuilder {
	/// API host the token endpoints are derived from.
	pub api_host: Option<Url>,
	/// Public host the embed URLs are derived from.
	pub embed_host: Option<Url>,
	/// Explicit access-token endpoint.
	pub access_token_endpoint: Option<Url>,
	/// Explicit embed-token endpoint.
	pub embed_token_endpoint: Option<Url>,
	/// Explicit embed render base.
	pub embed_base: Option<Url>,
	/// Embedded asset kind.
	pub kind: EmbedKind,
	/// Scopes requested during the client-credential exchange.
	pub scopes: Vec<String>,
	/// Deployment settings.
	pub settings: EmbedSettings,
}
impl PlatformDescriptorBuilder {
	/// Creates a builder seeded with the default scopes and settings.
	pub fn new() -> Self {
		Self {
			scopes: PlatformDescriptor::DEFAULT_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
			..Self::default()
		}
	}

	/// Sets the API host.
	pub fn api_host(mut self, url: Url) -> Self {
		self.api_host = Some(url);

		self
	}

	/// Sets the public embed host.
	pub fn embed_host(mut self, url: Url) -> Self {
		self.embed_host = Some(url);

		self
	}

	/// Overrides the access-token endpoint.
	pub fn access_token_endpoint(mut self, url: Url) -> Self {
		self.access_token_endpoint = Some(url);

		self
	}

	/// Overrides the embed-token endpoint.
	pub fn embed_token_endpoint(mut self, url: Url) -> Self {
		self.embed_token_endpoint = Some(url);

		self
	}

	/// Overrides the embed render base.
	pub fn embed_base(mut self, url: Url) -> Self {
		self.embed_base = Some(url);

		self
	}

	/// Selects the embedded asset kind.
	pub fn kind(mut self, kind: EmbedKind) -> Self {
		self.kind = kind;

		self
	}

	/// Replaces the exchange scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Replaces all deployment settings.
	pub fn settings(mut self, settings: EmbedSettings) -> Self {
		self.settings = settings;

		self
	}

	/// Overrides the embed session length.
	pub fn session_length_minutes(mut self, minutes: u32) -> Self {
		self.settings.session_length_minutes = minutes;

		self
	}

	/// Overrides the safety skew.
	pub fn safety_skew(mut self, skew: Duration) -> Self {
		self.settings.safety_skew = skew;

		self
	}

	/// Overrides the upstream request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.settings.request_timeout = timeout;

		self
	}

	/// Toggles the `referenceId` query parameter on embed URLs.
	pub fn reference_id_in_url(mut self, enabled: bool) -> Self {
		self.settings.reference_id_in_url = enabled;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<PlatformDescriptor, PlatformDescriptorError> {
		let access_token = resolve_endpoint(
			"access_token",
			self.access_token_endpoint,
			self.api_host.as_ref(),
			PlatformDescriptor::ACCESS_TOKEN_PATH,
		)?;
		let embed_token = resolve_endpoint(
			"embed_token",
			self.embed_token_endpoint,
			self.api_host.as_ref(),
			self.kind.mint_path(),
		)?;
		let embed_base = resolve_endpoint(
			"embed_base",
			self.embed_base,
			self.embed_host.as_ref(),
			self.kind.render_path(),
		)?;
		let descriptor = PlatformDescriptor {
			endpoints: PlatformEndpoints { access_token, embed_token, embed_base },
			kind: self.kind,
			scopes: self.scopes,
			settings: self.settings,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl PlatformDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), PlatformDescriptorError> {
		validate_endpoint("access_token", &self.endpoints.access_token)?;
		validate_endpoint("embed_token", &self.endpoints.embed_token)?;
		validate_endpoint("embed_base", &self.endpoints.embed_base)?;

		if self.settings.session_length_minutes == 0 {
			return Err(PlatformDescriptorError::NonPositiveSessionLength);
		}
		if self.settings.safety_skew.is_negative() {
			return Err(PlatformDescriptorError::NegativeSkew);
		}
		if !self.settings.request_timeout.is_positive() {
			return Err(PlatformDescriptorError::NonPositiveTimeout);
		}

		Ok(())
	}
}

fn resolve_endpoint(
	endpoint: &'static str,
	explicit: Option<Url>,
	host: Option<&Url>,
	path: &str,
) -> Result<Url, PlatformDescriptorError> {
	if let Some(url) = explicit {
		return Ok(url);
	}

	let host = host.ok_or(PlatformDescriptorError::MissingEndpoint { endpoint })?;

	host.join(path)
		.map_err(|e| PlatformDescriptorError::InvalidUrl { endpoint, reason: e.to_string() })
}

pub(crate) fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), PlatformDescriptorError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(PlatformDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}
