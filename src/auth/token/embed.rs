//! Cached embed-token records and their builder.

// self
use crate::{
	_prelude::*,
	auth::{DashboardId, TokenSecret, UserId},
};

/// Errors produced by [`EmbedTokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum EmbedTokenRecordBuilderError {
	/// Issued when no token value was provided.
	#[error("Embed token is required.")]
	MissingToken,
	/// Issued when no expiry was configured.
	#[error("Expiry must be supplied via expires_at.")]
	MissingExpiry,
	/// Issued when the filter fingerprint was not provided.
	#[error("Filter fingerprint is required.")]
	MissingFingerprint,
}

/// Embed token minted for one user, one dashboard, and one filter set.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbedTokenRecord {
	/// User the token was minted for.
	pub user: UserId,
	/// Dashboard the token renders.
	pub dashboard: DashboardId,
	/// Signed embed token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Fingerprint of the filters the token was minted with.
	pub filter_fingerprint: String,
	/// Mint instant.
	pub issued_at: OffsetDateTime,
	/// `exp` claim minus the safety skew.
	pub expires_at: OffsetDateTime,
}
impl EmbedTokenRecord {
	/// Returns a builder for the provided user/dashboard pair.
	pub fn builder(user: UserId, dashboard: DashboardId) -> EmbedTokenRecordBuilder {
		EmbedTokenRecordBuilder::new(user, dashboard)
	}

	/// Returns `true` once `instant` reaches the skewed expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the token may be served for `fingerprint` at `instant`.
	pub fn is_reusable_for(&self, fingerprint: &str, instant: OffsetDateTime) -> bool {
		!self.is_expired_at(instant) && self.filter_fingerprint == fingerprint
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for EmbedTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EmbedTokenRecord")
			.field("user", &self.user)
			.field("dashboard", &self.dashboard)
			.field("token", &"<redacted>")
			.field("filter_fingerprint", &self.filter_fingerprint)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`EmbedTokenRecord`].
#[derive(Clone, Debug)]
pub struct EmbedTokenRecordBuilder {
	user: UserId,
	dashboard: DashboardId,
	token: Option<TokenSecret>,
	filter_fingerprint: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
}
impl EmbedTokenRecordBuilder {
	fn new(user: UserId, dashboard: DashboardId) -> Self {
		Self {
			user,
			dashboard,
			token: None,
			filter_fingerprint: None,
			issued_at: None,
			expires_at: None,
		}
	}

	/// Provides the token value.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the filter fingerprint the token was minted for.
	pub fn filter_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
		self.filter_fingerprint = Some(fingerprint.into());

		self
	}

	/// Sets the mint instant (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets the skewed expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Consumes the builder and produces an [`EmbedTokenRecord`].
	pub fn build(self) -> Result<EmbedTokenRecord, EmbedTokenRecordBuilderError> {
		let token = self.token.ok_or(EmbedTokenRecordBuilderError::MissingToken)?;
		let expires_at = self.expires_at.ok_or(EmbedTokenRecordBuilderError::MissingExpiry)?;
		let filter_fingerprint =
			self.filter_fingerprint.ok_or(EmbedTokenRecordBuilderError::MissingFingerprint)?;

		Ok(EmbedTokenRecord {
			user: self.user,
			dashboard: self.dashboard,
			token,
			filter_fingerprint,
			issued_at: self.issued_at.unwrap_or_else(OffsetDateTime::now_utc),
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record() -> EmbedTokenRecord {
		EmbedTokenRecord::builder(
			UserId::new("u1").expect("User fixture should be valid."),
			DashboardId::new("d42").expect("Dashboard fixture should be valid."),
		)
		.token("embed")
		.filter_fingerprint("fp-west")
		.issued_at(macros::datetime!(2025-03-01 08:00 UTC))
		.expires_at(macros::datetime!(2025-03-01 09:00 UTC))
		.build()
		.expect("Record fixture should build.")
	}

	#[test]
	fn reuse_requires_matching_fingerprint_and_time() {
		let record = record();
		let before = macros::datetime!(2025-03-01 08:30 UTC);
		let at_expiry = macros::datetime!(2025-03-01 09:00 UTC);

		assert!(record.is_reusable_for("fp-west", before));
		assert!(!record.is_reusable_for("fp-east", before));
		assert!(!record.is_reusable_for("fp-west", at_expiry));
		assert_eq!(record.remaining_at(before), Duration::minutes(30));
		assert_eq!(record.remaining_at(macros::datetime!(2025-03-01 10:00 UTC)), Duration::ZERO);
	}

	#[test]
	fn builder_requires_token_expiry_and_fingerprint() {
		let user = UserId::new("u1").expect("User fixture should be valid.");
		let dashboard = DashboardId::new("d42").expect("Dashboard fixture should be valid.");
		let err = EmbedTokenRecord::builder(user.clone(), dashboard.clone())
			.token("embed")
			.build()
			.expect_err("Missing expiry should fail.");

		assert_eq!(err, EmbedTokenRecordBuilderError::MissingExpiry);

		let err = EmbedTokenRecord::builder(user, dashboard)
			.token("embed")
			.expires_at(OffsetDateTime::now_utc())
			.build()
			.expect_err("Missing fingerprint should fail.");

		assert_eq!(err, EmbedTokenRecordBuilderError::MissingFingerprint);
	}

	#[test]
	fn debug_output_redacts_the_token() {
		let rendered = format!("{:?}", record());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("\"embed\""));
	}
}
