// self
use crate::_prelude::*;

/// Deployment knobs that shape mint calls and token lifetimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
	/// Embed session length requested from the platform, in minutes.
	pub session_length_minutes: u32,
	/// Margin subtracted from every upstream expiry.
	pub safety_skew: Duration,
	/// Upper bound for each upstream call on the default transport.
	pub request_timeout: Duration,
	/// Appends `?referenceId=` to embed URLs (disabled for XHR-driven embeds).
	pub reference_id_in_url: bool,
}
impl EmbedSettings {
	/// One day, the platform's default embed session.
	pub const DEFAULT_SESSION_LENGTH_MINUTES: u32 = 1440;
	/// Safety skew applied to access and embed token expiries.
	pub const DEFAULT_SAFETY_SKEW: Duration = Duration::seconds(60);
	/// Timeout for upstream calls.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);
}
impl Default for EmbedSettings {
	fn default() -> Self {
		Self {
			session_length_minutes: Self::DEFAULT_SESSION_LENGTH_MINUTES,
			safety_skew: Self::DEFAULT_SAFETY_SKEW,
			request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
			reference_id_in_url: true,
		}
	}
}
