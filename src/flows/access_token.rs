//! Access-token acquisition with refresh coalescing.
//!
//! The cached token is served while it belongs to the requested credential pair and its skewed
//! expiry lies in the future. Otherwise one caller exchanges the credentials while the others
//! wait on the cache's refresh lock and pick up its result.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientCredentials},
	flows::Broker,
	http::UpstreamHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	upstream::TransportErrorMapper,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + UpstreamHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a valid platform access token for `credentials`, exchanging them when needed.
	pub async fn access_token(&self, credentials: &ClientCredentials) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::AccessToken;

		if let Some(token) = self.access_tokens.get(credentials, OffsetDateTime::now_utc()) {
			obs::record_flow_outcome(KIND, FlowOutcome::CacheHit);

			return Ok(token);
		}

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _refresh = self.access_tokens.refresh_guard().await;

				// Another caller may have refreshed the slot while this one waited.
				if let Some(token) =
					self.access_tokens.get(credentials, OffsetDateTime::now_utc())
				{
					return Ok(token);
				}

				let token = self.upstream().exchange(credentials).await?;

				self.metrics.record_exchange();
				self.access_tokens.put(token.clone());

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
