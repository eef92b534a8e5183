//! Platform descriptor: validated endpoints and deployment settings consumed by flows.
//!
//! The defaults mirror the hosted analytics platform the portal embeds: client credentials are
//! exchanged at `https://api.domo.com/oauth/token`, dashboards mint at
//! `/v1/stories/embed/auth` and render under `https://public.domo.com/embed/pages/`, cards mint
//! at `/v1/cards/embed/auth` and render under `https://public.domo.com/cards/`.

/// Builder API for assembling platform descriptors.
pub mod builder;
/// Identity-provider settings for edit links.
pub mod edit;
/// Embedded asset kinds.
pub mod kind;
/// Deployment settings.
pub mod settings;

pub use builder::*;
pub use edit::*;
pub use kind::*;
pub use settings::*;

// std
use std::env;
// self
use crate::{_prelude::*, auth::DashboardId};

/// Environment variable selecting dashboard or card embeds.
pub const EMBED_TYPE_ENV: &str = "EMBED_TYPE";
/// Environment variable that, when set, drops `referenceId` from embed URLs.
pub const USE_XHR_ENV: &str = "USE_XHR";

/// Endpoint set declared by a platform descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEndpoints {
	/// Client-credential exchange endpoint.
	pub access_token: Url,
	/// Embed-token mint endpoint.
	pub embed_token: Url,
	/// Base URL the embed id is appended to.
	pub embed_base: Url,
}

/// Immutable platform descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
	/// Endpoint definitions.
	pub endpoints: PlatformEndpoints,
	/// Embedded asset kind.
	pub kind: EmbedKind,
	/// Scopes requested during the client-credential exchange.
	pub scopes: Vec<String>,
	/// Deployment settings.
	pub settings: EmbedSettings,
}
impl PlatformDescriptor {
	/// Exchange endpoint path relative to the API host.
	pub const ACCESS_TOKEN_PATH: &str = "/oauth/token";
	/// Hosted platform API host.
	pub const DEFAULT_API_HOST: &str = "https://api.domo.com";
	/// Hosted platform public embed host.
	pub const DEFAULT_EMBED_HOST: &str = "https://public.domo.com";
	/// Scopes requested by default.
	pub const DEFAULT_SCOPES: &[&str] = &["data", "audit", "user", "dashboard"];

	/// Creates a new builder.
	pub fn builder() -> PlatformDescriptorBuilder {
		PlatformDescriptorBuilder::new()
	}

	/// Descriptor for the hosted platform and the given asset kind.
	pub fn hosted(kind: EmbedKind) -> Result<Self, PlatformDescriptorError> {
		Self::builder()
			.api_host(parse_default("api_host", Self::DEFAULT_API_HOST)?)
			.embed_host(parse_default("embed_host", Self::DEFAULT_EMBED_HOST)?)
			.kind(kind)
			.build()
	}

	/// Hosted descriptor configured from `EMBED_TYPE` and `USE_XHR`.
	pub fn from_env() -> Result<Self, PlatformDescriptorError> {
		let kind = EmbedKind::from_env_value(env::var(EMBED_TYPE_ENV).ok().as_deref());
		let use_xhr = env::var(USE_XHR_ENV).is_ok_and(|value| !value.is_empty());
		let mut descriptor = Self::hosted(kind)?;

		descriptor.settings.reference_id_in_url = !use_xhr;

		Ok(descriptor)
	}

	/// Exchange URL carrying the `grant_type` and `scope` query parameters.
	pub fn access_token_url(&self) -> Url {
		let mut url = self.endpoints.access_token.clone();

		{
			let mut query = url.query_pairs_mut();

			query.append_pair("grant_type", "client_credentials");

			if !self.scopes.is_empty() {
				query.append_pair("scope", &self.scopes.join(" "));
			}
		}

		url
	}

	/// Iframe URL for `dashboard`, with `referenceId` when enabled and provided.
	pub fn embed_url(&self, dashboard: &DashboardId, reference_id: Option<&str>) -> Url {
		let mut url = self.endpoints.embed_base.clone();

		if let Ok(mut segments) = url.path_segments_mut() {
			segments.pop_if_empty().push(dashboard.as_str());
		}
		if let Some(reference) = reference_id.filter(|_| self.settings.reference_id_in_url) {
			url.query_pairs_mut().append_pair("referenceId", reference);
		}

		url
	}
}

fn parse_default(endpoint: &'static str, raw: &str) -> Result<Url, PlatformDescriptorError> {
	Url::parse(raw)
		.map_err(|e| PlatformDescriptorError::InvalidUrl { endpoint, reason: e.to_string() })
}
