// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Value, json};
// self
use embed_broker::{
	_preludet::*,
	auth::{ClientCredentials, DashboardId, EmbedTokenRecord, Filter, FilterOperator, FilterSet, UserId},
	error::{ConfigError, ErrorKind, TransportError, UpstreamError},
	flows::{Broker, EditRequest, EmbedRequest, GrantOrigin},
	platform::{EditLinkConfig, PlatformDescriptor},
	store::{EmbedKey, EmbedTokenStore, MemoryStore, StoreError, StoreFuture},
	upstream::ReqwestTransportErrorMapper,
};

const CLIENT_ID: &str = "embed-client";
const CLIENT_SECRET: &str = "embed-secret";
const ACCESS_PATH: &str = "/oauth/token";
const MINT_PATH: &str = "/v1/stories/embed/auth";

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse fixture URL.")
}

fn build_descriptor(server: &MockServer) -> PlatformDescriptor {
	PlatformDescriptor::builder()
		.api_host(url(&server.base_url()))
		.embed_host(url("https://public.example.com"))
		.build()
		.expect("Platform descriptor should build against the mock server.")
}

fn user(value: &str) -> UserId {
	UserId::new(value).expect("User fixture should be valid.")
}

fn dashboard(value: &str) -> DashboardId {
	DashboardId::new(value).expect("Dashboard fixture should be valid.")
}

fn basic(client_id: &str, client_secret: &str) -> String {
	ClientCredentials::new(client_id, client_secret).basic_authorization()
}

fn exp_in(seconds: i64) -> i64 {
	OffsetDateTime::now_utc().unix_timestamp() + seconds
}

async fn mock_exchange<'a>(
	server: &'a MockServer,
	client_id: &str,
	client_secret: &str,
	access_token: &str,
) -> httpmock::Mock<'a> {
	let authorization = basic(client_id, client_secret);
	let body = json!({ "access_token": access_token, "expires_in": 3600, "userId": 27 }).to_string();

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(ACCESS_PATH)
				.query_param("grant_type", "client_credentials")
				.header("authorization", authorization.as_str());
			then.status(200).header("content-type", "application/json").body(body.as_str());
		})
		.await
}

async fn mock_mint<'a>(
	server: &'a MockServer,
	access_token: &str,
	embed_token: &str,
) -> httpmock::Mock<'a> {
	let bearer = format!("Bearer {access_token}");
	let body = json!({ "authentication": embed_token }).to_string();

	server
		.mock_async(|when, then| {
			when.method(POST).path(MINT_PATH).header("authorization", bearer.as_str());
			then.status(200).header("content-type", "application/json").body(body.as_str());
		})
		.await
}

fn region_in(values: impl Into<embed_broker::auth::FilterValues>) -> Filter {
	Filter::new("Region", FilterOperator::In, values)
}

#[tokio::test]
async fn cached_embed_token_is_reused_without_network() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let request = EmbedRequest::new(user("alice"), dashboard("d42"));
	let first = broker.resolve(request.clone()).await.expect("First resolve should mint.");
	let second = broker.resolve(request).await.expect("Second resolve should hit the store.");

	assert_eq!(first.origin, GrantOrigin::Minted);
	assert_eq!(second.origin, GrantOrigin::Cache);
	assert_eq!(first.embed_token, second.embed_token);
	assert_eq!(store.len(), 1);
	assert_eq!(broker.metrics.mints(), 1);
	assert_eq!(broker.metrics.cache_hits(), 1);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn scalar_and_sequence_in_filters_share_a_token() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let started = OffsetDateTime::now_utc();
	let scalar = EmbedRequest::new(user("alice"), dashboard("d42")).with_filters([region_in("west")]);
	let sequence =
		EmbedRequest::new(user("alice"), dashboard("d42")).with_filters([region_in(vec!["west"])]);
	let minted = broker.resolve(scalar).await.expect("Scalar filter resolve should mint.");
	let reused = broker.resolve(sequence).await.expect("Sequence filter resolve should reuse.");
	let expected = started + Duration::seconds(3540);

	assert_eq!(reused.origin, GrantOrigin::Cache);
	assert!(
		(minted.expires_at - expected).abs() <= Duration::seconds(5),
		"Expiry should be exp minus the 60s skew, got {}.",
		minted.expires_at
	);

	let stored = store
		.peek(&EmbedKey::new(user("alice"), dashboard("d42")))
		.expect("Minted record should be stored.");
	let fingerprint = FilterSet::new([region_in(vec!["west"])], Vec::new())
		.expect("Filter fixture should be valid.");

	assert_eq!(stored.filter_fingerprint, fingerprint.fingerprint());

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn filter_changes_force_a_new_mint_but_reordering_does_not() {
	let server = MockServer::start_async().await;
	let (broker, _store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let segment = Filter::new("Segment", FilterOperator::Equals, "smb");
	let base = || EmbedRequest::new(user("alice"), dashboard("d42"));

	broker
		.resolve(base().with_filters([region_in("west"), segment.clone()]))
		.await
		.expect("Initial resolve should mint.");

	let reordered = broker
		.resolve(base().with_filters([segment.clone(), region_in("west")]))
		.await
		.expect("Reordered filters should resolve.");

	assert_eq!(reordered.origin, GrantOrigin::Cache);

	let changed = broker
		.resolve(base().with_filters([region_in("east"), segment]))
		.await
		.expect("Changed filters should resolve.");

	assert_eq!(changed.origin, GrantOrigin::Minted);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(2).await;
}

#[tokio::test]
async fn expired_records_are_replaced() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let unrestricted = FilterSet::unrestricted().expect("Empty filter set should be valid.");
	let now = OffsetDateTime::now_utc();
	let stale = EmbedTokenRecord::builder(user("alice"), dashboard("d42"))
		.token("stale-token")
		.filter_fingerprint(unrestricted.fingerprint())
		.issued_at(now - Duration::hours(2))
		.expires_at(now - Duration::seconds(1))
		.build()
		.expect("Stale record fixture should build.");

	store.put(stale).await.expect("Seeding the store should succeed.");

	let grant = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect("Resolve should mint over the expired record.");

	assert_eq!(grant.origin, GrantOrigin::Minted);
	assert_ne!(grant.embed_token.expose(), "stale-token");
	assert!(grant.expires_at > now);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn rotated_credentials_trigger_a_new_exchange() {
	let server = MockServer::start_async().await;
	let (broker, _store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let original = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let rotated = mock_exchange(&server, CLIENT_ID, "rotated-secret", "access-2").await;
	let mint_original =
		mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d1"])).await;
	let mint_rotated = mock_mint(&server, "access-2", &fake_embed_token(exp_in(3600), &["d2"])).await;

	broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d1")))
		.await
		.expect("Resolve with the configured credentials should succeed.");
	broker
		.resolve(
			EmbedRequest::new(user("alice"), dashboard("d2"))
				.with_credentials(ClientCredentials::new(CLIENT_ID, "rotated-secret")),
		)
		.await
		.expect("Resolve with rotated credentials should succeed.");

	original.assert_calls_async(1).await;
	rotated.assert_calls_async(1).await;
	mint_original.assert_calls_async(1).await;
	mint_rotated.assert_calls_async(1).await;
	assert_eq!(broker.metrics.exchanges(), 2);
}

#[tokio::test]
async fn tokens_are_isolated_per_user_and_dashboard() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["any"])).await;

	for (who, what) in [("alice", "d1"), ("bob", "d1"), ("alice", "d2")] {
		let grant = broker
			.resolve(EmbedRequest::new(user(who), dashboard(what)))
			.await
			.expect("Each distinct key should resolve.");

		assert_eq!(grant.origin, GrantOrigin::Minted, "{who}/{what} must not reuse another key.");
	}

	assert_eq!(store.len(), 3);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(3).await;
}

#[tokio::test]
async fn empty_grant_is_reported_and_not_stored() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let _exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &[])).await;
	let err = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect_err("An empty emb claim must fail.");

	assert!(matches!(err, Error::EmptyAuthorization { ref dashboard } if dashboard.as_str() == "d42"));
	assert_eq!(err.kind(), ErrorKind::EmptyAuthorization);
	assert!(store.is_empty());

	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_resolves_for_one_key_mint_once() {
	let server = MockServer::start_async().await;
	let (broker, _store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let request = EmbedRequest::new(user("alice"), dashboard("d42"));
	let (first, second) = tokio::join!(broker.resolve(request.clone()), broker.resolve(request));
	let first = first.expect("First concurrent resolve should succeed.");
	let second = second.expect("Second concurrent resolve should succeed.");

	assert_eq!(first.embed_token, second.embed_token);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_user_context_skips_the_network() {
	let server = MockServer::start_async().await;
	let (broker, _store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let err = broker
		.resolve(EmbedRequest::new(None, dashboard("d42")))
		.await
		.expect_err("Requests without a user must fail.");

	assert!(matches!(err, Error::MissingUserContext));
	assert_eq!(err.kind(), ErrorKind::Unauthenticated);

	exchange.assert_calls_async(0).await;
	mint.assert_calls_async(0).await;
}

#[tokio::test]
async fn mint_error_field_surfaces_as_upstream_mint() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let _exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = server
		.mock_async(|when, then| {
			when.method(POST).path(MINT_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"error\":\"Dashboard not shared with client\"}");
		})
		.await;
	let err = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect_err("An error field must fail the mint.");

	match &err {
		Error::UpstreamMint(UpstreamError::Rejected { message }) =>
			assert_eq!(message, "Dashboard not shared with client"),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(store.is_empty());
	assert_eq!(broker.metrics.failures(), 1);

	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_exchange_surfaces_as_upstream_auth() {
	let server = MockServer::start_async().await;
	let (broker, _store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path(ACCESS_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"unauthorized\",\"error_description\":\"Bad credentials\"}");
		})
		.await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let err = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect_err("A 401 exchange must fail.");

	assert_eq!(err.kind(), ErrorKind::UpstreamAuth);

	match err {
		Error::UpstreamAuth(UpstreamError::Status { status, message, .. }) => {
			assert_eq!(status, 401);
			assert_eq!(message, "Bad credentials");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(0).await;
}

#[tokio::test]
async fn force_refresh_and_invalidation_bypass_the_store() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let request = EmbedRequest::new(user("alice"), dashboard("d42"));

	broker.resolve(request.clone()).await.expect("Initial resolve should mint.");

	let forced = broker
		.resolve(request.clone().force_refresh())
		.await
		.expect("Forced resolve should mint.");

	assert_eq!(forced.origin, GrantOrigin::Minted);
	assert!(
		broker
			.invalidate_embed(&user("alice"), &dashboard("d42"))
			.await
			.expect("Invalidation should succeed.")
	);
	assert!(store.is_empty());

	broker.resolve(request).await.expect("Resolve after invalidation should mint.");

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(3).await;
}

#[tokio::test]
async fn embed_info_serializes_token_and_url() {
	let server = MockServer::start_async().await;
	let (broker, _store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let embed_token = fake_embed_token(exp_in(3600), &["Xb9Lm"]);
	let _exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let _mint = mock_mint(&server, "access-1", &embed_token).await;
	let info = broker
		.embed_info(EmbedRequest::new(user("alice"), dashboard("Xb9Lm")).with_reference_id("card-3"))
		.await
		.expect("Embed info should resolve.");
	let payload = serde_json::to_value(&info).expect("Embed info should serialize.");

	assert_eq!(
		payload,
		json!({
			"embedToken": embed_token,
			"embedUrl": "https://public.example.com/embed/pages/Xb9Lm?referenceId=card-3",
		})
	);
}

#[tokio::test]
async fn missing_credentials_are_a_configuration_error() {
	let server = MockServer::start_async().await;
	let store: Arc<dyn EmbedTokenStore> = Arc::new(MemoryStore::default());
	let broker: ReqwestTestBroker = Broker::with_http_client(
		store,
		build_descriptor(&server),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	);
	let err = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect_err("Resolving without credentials must fail.");

	assert!(matches!(err, Error::Config(ConfigError::MissingCredentials)));
	assert_eq!(err.kind(), ErrorKind::Configuration);
}

/// Store whose writes always fail while reads see an empty store.
struct ReadOnlyStore;
impl EmbedTokenStore for ReadOnlyStore {
	fn lookup<'a>(
		&'a self,
		_key: &'a EmbedKey,
		_now: OffsetDateTime,
	) -> StoreFuture<'a, Option<EmbedTokenRecord>> {
		Box::pin(async { Ok(None) })
	}

	fn put(&self, _record: EmbedTokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "read-only volume".into() }) })
	}

	fn remove<'a>(&'a self, _key: &'a EmbedKey) -> StoreFuture<'a, Option<EmbedTokenRecord>> {
		Box::pin(async { Ok(None) })
	}

	fn purge_expired(&self, _now: OffsetDateTime) -> StoreFuture<'_, usize> {
		Box::pin(async { Ok(0) })
	}
}

#[tokio::test]
async fn failed_persistence_still_returns_the_minted_token() {
	let server = MockServer::start_async().await;
	let store: Arc<dyn EmbedTokenStore> = Arc::new(ReadOnlyStore);
	let broker: ReqwestTestBroker = Broker::with_http_client(
		store,
		build_descriptor(&server),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.with_credentials(ClientCredentials::new(CLIENT_ID, CLIENT_SECRET));
	let _exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint = mock_mint(&server, "access-1", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let grant = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect("A failed write must not fail the resolve.");

	assert_eq!(
		grant.origin,
		GrantOrigin::MintedUnpersisted {
			error: StoreError::Backend { message: "read-only volume".into() }
		}
	);
	assert!(!grant.origin.is_persisted());
	assert_eq!(broker.metrics.unpersisted(), 1);

	broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect("The next resolve should mint again.");

	mint.assert_calls_async(2).await;
}

fn build_timeout_broker(server: &MockServer) -> (ReqwestTestBroker, Arc<MemoryStore>) {
	let descriptor = PlatformDescriptor::builder()
		.api_host(url(&server.base_url()))
		.embed_host(url("https://public.example.com"))
		.request_timeout(Duration::milliseconds(200))
		.build()
		.expect("Platform descriptor should build with a short timeout.");
	let backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn EmbedTokenStore> = backend.clone();
	let broker = Broker::new(store, descriptor)
		.expect("Broker should build its own timeout-bound transport.")
		.with_credentials(ClientCredentials::new(CLIENT_ID, CLIENT_SECRET));

	(broker, backend)
}

#[tokio::test]
async fn slow_exchange_times_out_as_upstream_auth() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_timeout_broker(&server);
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path(ACCESS_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-slow\",\"expires_in\":3600}")
				.delay(StdDuration::from_secs(2));
		})
		.await;
	let mint = mock_mint(&server, "access-slow", &fake_embed_token(exp_in(3600), &["d42"])).await;
	let err = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect_err("A delayed exchange must hit the request timeout.");

	assert!(
		matches!(err, Error::UpstreamAuth(UpstreamError::Transport(TransportError::Timeout))),
		"Unexpected error: {err:?}."
	);
	assert_eq!(store.len(), 0);
	assert_eq!(broker.metrics.failures(), 1);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(0).await;
}

#[tokio::test]
async fn slow_mint_times_out_and_leaves_the_store_untouched() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_timeout_broker(&server);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let mint_body =
		json!({ "authentication": fake_embed_token(exp_in(3600), &["d42"]) }).to_string();
	let mint = server
		.mock_async(|when, then| {
			when.method(POST).path(MINT_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(mint_body.as_str())
				.delay(StdDuration::from_secs(2));
		})
		.await;
	let err = broker
		.resolve(EmbedRequest::new(user("alice"), dashboard("d42")))
		.await
		.expect_err("A delayed mint must hit the request timeout.");

	assert!(
		matches!(err, Error::UpstreamMint(UpstreamError::Transport(TransportError::Timeout))),
		"Unexpected error: {err:?}."
	);
	assert_eq!(store.len(), 0);
	assert!(store.peek(&EmbedKey::new(user("alice"), dashboard("d42"))).is_none());
	assert_eq!(broker.metrics.mints(), 0);

	exchange.assert_calls_async(1).await;
	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn edit_links_are_signed_locally() {
	let server = MockServer::start_async().await;
	let (broker, store) =
		build_reqwest_test_broker(build_descriptor(&server), CLIENT_ID, CLIENT_SECRET);
	let exchange = mock_exchange(&server, CLIENT_ID, CLIENT_SECRET, "access-1").await;
	let config = EditLinkConfig::new(url("http://localhost:4000/idp"), "region", "edit-secret")
		.expect("Edit link settings should validate.");
	let broker = broker.with_edit_link(config);
	let request = EditRequest::new(user("alice"), "alice@example.com").with_mapping_value("west");
	let link = broker.edit_url(&request).expect("Edit link should be issued.");

	assert_eq!(link.origin().ascii_serialization(), "http://localhost:4000");
	assert_eq!(link.path(), "/idp/jwt");

	let token = link
		.query_pairs()
		.find(|(key, _)| key == "token")
		.map(|(_, value)| value.into_owned())
		.expect("Edit link should carry a token.");
	let claims = jsonwebtoken::decode::<Value>(
		&token,
		&DecodingKey::from_secret(b"edit-secret"),
		&Validation::new(Algorithm::HS256),
	)
	.expect("Edit token should verify with the shared secret.")
	.claims;

	assert_eq!(claims["sub"], "alice");
	assert_eq!(claims["name"], "alice");
	assert_eq!(claims["email"], "alice@example.com");
	assert_eq!(claims["role"], "Admin");
	assert_eq!(claims["region"], "west");
	assert!(claims["jti"].as_str().is_some_and(|jti| !jti.is_empty()));

	let lifetime = claims["exp"].as_i64().zip(claims["iat"].as_i64()).map(|(exp, iat)| exp - iat);

	assert_eq!(lifetime, Some(300));
	assert_eq!(store.len(), 0);

	exchange.assert_calls_async(0).await;
}
