// self
use crate::_prelude::*;

/// Kind of embedded asset; decides which mint endpoint and render base the broker uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedKind {
	/// Full dashboard (a "story" on the platform).
	#[default]
	Dashboard,
	/// Single card.
	Card,
}
impl EmbedKind {
	/// Returns a stable label for logs and configuration.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Dashboard => "dashboard",
			Self::Card => "card",
		}
	}

	/// Mint endpoint path relative to the API host.
	pub const fn mint_path(self) -> &'static str {
		match self {
			Self::Dashboard => "/v1/stories/embed/auth",
			Self::Card => "/v1/cards/embed/auth",
		}
	}

	/// Render base path relative to the embed host; the embed id is appended to it.
	pub const fn render_path(self) -> &'static str {
		match self {
			Self::Dashboard => "/embed/pages/",
			Self::Card => "/cards/",
		}
	}

	/// Parses the `EMBED_TYPE` deployment value; anything but `card` means dashboards.
	pub fn from_env_value(value: Option<&str>) -> Self {
		match value.map(str::trim) {
			Some(value) if value.eq_ignore_ascii_case("card") => Self::Card,
			_ => Self::Dashboard,
		}
	}
}
impl Display for EmbedKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
