//! Unverified decoding of embed-token claims.
//!
//! The platform signs embed tokens and verifies them itself when the iframe loads; the broker
//! only needs to read `exp` and the `emb` grant list out of the compact JWS payload.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;
// self
use crate::_prelude::*;

/// Errors raised while decoding an embed token payload.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// The token is not a three-segment compact JWS.
	#[error("Embed token is not a compact JWS (expected 3 segments, found {segments}).")]
	Segments {
		/// Number of `.`-separated segments found.
		segments: usize,
	},
	/// The payload segment is not valid base64url.
	#[error("Embed token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// The payload JSON does not carry the expected claims.
	#[error("Embed token payload has unexpected claims.")]
	Payload(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// The `exp` claim cannot be represented as an instant.
	#[error("Embed token exp claim {exp} is out of range.")]
	ExpiryOutOfRange {
		/// Raw claim value.
		exp: i64,
	},
}

/// Claims the broker reads from a minted embed token.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EmbedClaims {
	/// Expiry as seconds since the Unix epoch.
	pub exp: i64,
	/// Authorization grants; empty when the issuing identity cannot see the dashboard.
	#[serde(default)]
	pub emb: Vec<Value>,
}
impl EmbedClaims {
	/// Decodes the payload segment of `token` without verifying its signature.
	pub fn decode(token: &str) -> Result<Self, ClaimsError> {
		let segments = token.split('.').collect::<Vec<_>>();
		let [_, payload, _] = segments.as_slice() else {
			return Err(ClaimsError::Segments { segments: segments.len() });
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		Ok(serde_path_to_error::deserialize(de)?)
	}

	/// Returns `true` when the token grants access to at least one embed.
	pub fn has_grant(&self) -> bool {
		!self.emb.is_empty()
	}

	/// `exp` as an instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime, ClaimsError> {
		OffsetDateTime::from_unix_timestamp(self.exp)
			.map_err(|_| ClaimsError::ExpiryOutOfRange { exp: self.exp })
	}

	/// `exp` shortened by `skew`; out-of-range results are rejected instead of wrapping.
	pub fn expires_at_with_skew(&self, skew: Duration) -> Result<OffsetDateTime, ClaimsError> {
		self.expires_at()?
			.checked_sub(skew)
			.ok_or(ClaimsError::ExpiryOutOfRange { exp: self.exp })
	}
}
