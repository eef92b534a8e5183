//! Edit links: a five-minute HS256 token that signs the portal user into the platform's
//! identity provider with authoring rights.
//!
//! Nothing is cached or sent upstream; every call signs a fresh token with a new `jti`.

// self
use crate::{
	_prelude::*,
	auth::{EditClaims, MappingValue, UserId},
	error::ConfigError,
	flows::Broker,
	http::UpstreamHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	platform::EditLinkConfig,
	upstream::TransportErrorMapper,
};

/// Edit-link request as handed over by the identity layer.
#[derive(Clone, Debug)]
pub struct EditRequest {
	/// Authenticated portal user; its name becomes `sub` and `name`.
	pub user: Option<UserId>,
	/// Email of the portal user.
	pub email: String,
	/// Mapping value forwarded under the configured key attribute.
	pub mapping_value: Option<MappingValue>,
}
impl EditRequest {
	/// Creates a request without a mapping value.
	pub fn new(user: impl Into<Option<UserId>>, email: impl Into<String>) -> Self {
		Self { user: user.into(), email: email.into(), mapping_value: None }
	}

	/// Attaches the stored mapping value; comma-separated values are split into a list.
	pub fn with_mapping_value(mut self, raw: impl Into<String>) -> Self {
		self.mapping_value = Some(MappingValue::parse(raw));

		self
	}
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sets or replaces the identity-provider settings used by [`Broker::edit_url`].
	pub fn with_edit_link(mut self, config: EditLinkConfig) -> Self {
		self.edit_link = Some(Arc::new(config));

		self
	}

	/// Signs an edit token for the user and returns `{idp_url}/jwt?token=…`.
	pub fn edit_url(&self, request: &EditRequest) -> Result<Url> {
		const KIND: FlowKind = FlowKind::EditLink;

		let span = FlowSpan::new(KIND, "sign");

		if let Some(user) = &request.user {
			span.record_user(user);
		}

		let _guard = span.entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.sign_edit_link(request);

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn sign_edit_link(&self, request: &EditRequest) -> Result<Url> {
		let config = self.edit_link.as_deref().ok_or(ConfigError::MissingEditLink)?;
		let user = request.user.as_ref().ok_or(Error::MissingUserContext)?;
		let claims = EditClaims::new(
			user.as_str(),
			request.email.clone(),
			config.key_attribute(),
			request.mapping_value.clone(),
			OffsetDateTime::now_utc(),
			config.ttl(),
		);
		let token = claims.sign(config.secret()).map_err(ConfigError::EditTokenSign)?;

		Ok(config.link_for(&token))
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use jsonwebtoken::{Algorithm, DecodingKey, Validation};
	// self
	use super::*;
	use crate::{
		_preludet::*,
		platform::PlatformDescriptor,
		store::{EmbedTokenStore, MemoryStore},
		upstream::ReqwestTransportErrorMapper,
	};

	fn broker() -> ReqwestTestBroker {
		let store: Arc<dyn EmbedTokenStore> = Arc::new(MemoryStore::default());
		let descriptor =
			PlatformDescriptor::hosted(Default::default()).expect("Hosted descriptor should build.");

		Broker::with_http_client(
			store,
			descriptor,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
	}

	fn config() -> EditLinkConfig {
		EditLinkConfig::new(
			Url::parse("https://idp.example.com").expect("Fixture URL should parse."),
			"region",
			"edit-secret",
		)
		.expect("Edit link fixture should validate.")
	}

	fn token_of(url: &Url) -> String {
		url.query_pairs()
			.find(|(key, _)| key == "token")
			.map(|(_, value)| value.into_owned())
			.expect("Edit link should carry a token.")
	}

	#[test]
	fn edit_links_carry_a_verifiable_token() {
		let broker = broker().with_edit_link(config());
		let user = UserId::new("alice").expect("User fixture should be valid.");
		let request = EditRequest::new(user, "alice@example.com").with_mapping_value("west, east");
		let url = broker.edit_url(&request).expect("Edit link should be issued.");

		assert_eq!(url.path(), "/jwt");

		let decoded = jsonwebtoken::decode::<EditClaims>(
			&token_of(&url),
			&DecodingKey::from_secret(b"edit-secret"),
			&Validation::new(Algorithm::HS256),
		)
		.expect("Edit token should verify.");

		assert_eq!(decoded.claims.sub, "alice");
		assert_eq!(decoded.claims.role, "Admin");
		assert_eq!(decoded.claims.exp - decoded.claims.iat, 300);
		assert_eq!(
			decoded.claims.attributes.get("region"),
			Some(&MappingValue::List(vec!["west".into(), "east".into()]))
		);

		let again = broker.edit_url(&request).expect("Edit link should be issued.");

		assert_ne!(token_of(&url), token_of(&again), "Every link gets a fresh jti.");
	}

	#[test]
	fn edit_links_need_settings_and_a_user() {
		let request = EditRequest::new(None, "anon@example.com");

		assert!(matches!(
			broker().edit_url(&request),
			Err(Error::Config(ConfigError::MissingEditLink))
		));
		assert!(matches!(
			broker().with_edit_link(config()).edit_url(&request),
			Err(Error::MissingUserContext)
		));
	}
}
