//! Embed-token broker for iframe analytics dashboards: exchange service credentials for a
//! platform access token, mint per-user, per-dashboard embed tokens, and reuse them only while
//! their filters still match.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod platform;
pub mod store;
pub mod upstream;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::ClientCredentials,
		flows::Broker,
		http::ReqwestHttpClient,
		platform::PlatformDescriptor,
		store::{EmbedTokenStore, MemoryStore},
		upstream::ReqwestTransportErrorMapper,
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(std::time::Duration::from_secs(10))
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`Broker`] backed by an in-memory store and the reqwest transport used across
	/// integration tests.
	pub fn build_reqwest_test_broker(
		descriptor: PlatformDescriptor,
		client_id: &str,
		client_secret: &str,
	) -> (ReqwestTestBroker, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn EmbedTokenStore> = store_backend.clone();
		let http_client = test_reqwest_http_client();
		let mapper = Arc::new(ReqwestTransportErrorMapper);
		let broker = Broker::with_http_client(store, descriptor, http_client, mapper)
			.with_credentials(ClientCredentials::new(client_id, client_secret));

		(broker, store_backend)
	}

	/// Encodes an unsigned compact JWS whose payload carries the provided `exp` and `emb` claims.
	pub fn fake_embed_token(exp: i64, emb: &[&str]) -> String {
		use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
		let payload = serde_json::json!({ "exp": exp, "emb": emb });
		let payload = URL_SAFE_NO_PAD.encode(payload.to_string());

		format!("{header}.{payload}.signature")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
