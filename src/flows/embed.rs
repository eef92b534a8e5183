//! Embed-token resolution: store lookup, mint on miss, and persistence.
//!
//! A stored token is reused only when it was minted for the same user, dashboard, and filter
//! fingerprint and its skewed expiry lies in the future. Concurrent resolves for one
//! user/dashboard pair are serialized, so followers find the leader's record instead of minting
//! again.

// self
use crate::{
	_prelude::*,
	auth::{ClaimsError, DashboardId, EmbedClaims, EmbedTokenRecord, FilterSet, TokenSecret, UserId},
	error::{ConfigError, UpstreamError},
	flows::{Broker, EmbedRequest},
	http::UpstreamHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{EmbedKey, StoreError},
	upstream::TransportErrorMapper,
};

/// Where the token of an [`EmbedGrant`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantOrigin {
	/// Reused from the embed-token store.
	Cache,
	/// Freshly minted and persisted.
	Minted,
	/// Freshly minted; the store rejected the write, so the next resolve mints again.
	MintedUnpersisted {
		/// Store failure raised by the write.
		error: StoreError,
	},
}
impl GrantOrigin {
	/// Returns `true` when the token is known to be in the store.
	pub fn is_persisted(&self) -> bool {
		!matches!(self, Self::MintedUnpersisted { .. })
	}
}

/// Embed token handed back to the caller.
#[derive(Clone, Debug)]
pub struct EmbedGrant {
	/// Signed embed token.
	pub embed_token: TokenSecret,
	/// Skewed expiry of the token.
	pub expires_at: OffsetDateTime,
	/// Cache or mint provenance.
	pub origin: GrantOrigin,
}
impl EmbedGrant {
	fn from_record(record: EmbedTokenRecord, origin: GrantOrigin) -> Self {
		Self { embed_token: record.token, expires_at: record.expires_at, origin }
	}
}

/// Boundary payload carrying everything the browser needs to render the iframe.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedInfo {
	/// Signed embed token, posted to the embed URL.
	pub embed_token: TokenSecret,
	/// Iframe URL for the dashboard.
	pub embed_url: Url,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a valid embed token for the request, minting one when no reusable record exists.
	pub async fn resolve(&self, request: EmbedRequest) -> Result<EmbedGrant> {
		const KIND: FlowKind = FlowKind::EmbedToken;

		let span = FlowSpan::new(KIND, "resolve");

		if let Some(user) = &request.user {
			span.record_user(user);
		}

		span.record_dashboard(&request.dashboard);
		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.resolve_inner(request)).await;

		match &result {
			Ok(grant) if grant.origin == GrantOrigin::Cache => {
				self.metrics.record_cache_hit();
				obs::record_flow_outcome(KIND, FlowOutcome::CacheHit);
			},
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Resolves the request and pairs the token with the dashboard's embed URL.
	pub async fn embed_info(&self, request: EmbedRequest) -> Result<EmbedInfo> {
		let dashboard = request.dashboard.clone();
		let reference_id = request.reference_id.clone();
		let grant = self.resolve(request).await?;

		Ok(EmbedInfo {
			embed_token: grant.embed_token,
			embed_url: self.descriptor.embed_url(&dashboard, reference_id.as_deref()),
		})
	}

	/// Deletes the stored token for the user/dashboard pair; returns whether one existed.
	pub async fn invalidate_embed(&self, user: &UserId, dashboard: &DashboardId) -> Result<bool> {
		let key = EmbedKey::new(user.clone(), dashboard.clone());
		let _flight = self.flights.acquire(&key).await;

		Ok(self.store.remove(&key).await?.is_some())
	}

	/// Purges expired records from the store and returns how many were dropped.
	pub async fn compact_embed_tokens(&self) -> Result<usize> {
		Ok(self.store.purge_expired(OffsetDateTime::now_utc()).await?)
	}

	async fn resolve_inner(&self, request: EmbedRequest) -> Result<EmbedGrant> {
		let EmbedRequest { user, dashboard, filters, policies, credentials, force, .. } = request;
		let user = user.ok_or(Error::MissingUserContext)?;
		let filters = FilterSet::new(filters, policies).map_err(ConfigError::from)?;
		let key = EmbedKey::new(user, dashboard);
		let _flight = self.flights.acquire(&key).await;

		if !force {
			let now = OffsetDateTime::now_utc();
			let reusable = self
				.store
				.lookup(&key, now)
				.await?
				.filter(|record| record.is_reusable_for(filters.fingerprint(), now));

			if let Some(record) = reusable {
				return Ok(EmbedGrant::from_record(record, GrantOrigin::Cache));
			}
		}

		let credentials = credentials
			.as_ref()
			.or(self.credentials.as_ref())
			.ok_or(ConfigError::MissingCredentials)?;
		let access = self.access_token(credentials).await?;
		let issued_at = OffsetDateTime::now_utc();
		let token = self.upstream().mint(&access, &key.dashboard, &filters).await?;

		self.metrics.record_mint();

		let claims = EmbedClaims::decode(&token).map_err(malformed_token)?;

		if !claims.has_grant() {
			return Err(Error::EmptyAuthorization { dashboard: key.dashboard });
		}

		let expires_at = claims
			.expires_at_with_skew(self.descriptor.settings.safety_skew)
			.map_err(malformed_token)?;
		let record = EmbedTokenRecord {
			user: key.user.clone(),
			dashboard: key.dashboard.clone(),
			token: TokenSecret::new(token),
			filter_fingerprint: filters.fingerprint().to_owned(),
			issued_at,
			expires_at,
		};
		let origin = match self.store.put(record.clone()).await {
			Ok(()) => GrantOrigin::Minted,
			Err(error) => {
				self.metrics.record_unpersisted();

				#[cfg(feature = "tracing")]
				tracing::warn!(key = %key, error = %error, "minted embed token was not persisted");

				GrantOrigin::MintedUnpersisted { error }
			},
		};

		Ok(EmbedGrant::from_record(record, origin))
	}
}

fn malformed_token(error: ClaimsError) -> Error {
	Error::UpstreamMint(UpstreamError::MalformedToken(error))
}
