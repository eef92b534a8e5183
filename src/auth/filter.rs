//! Row-level filter modeling, normalization, and the canonical filter fingerprint.
//!
//! Filters travel with every embed-token mint and decide which rows a user may see, so the
//! broker only reuses a cached embed token when the fingerprint of the filters in effect matches
//! the one the token was minted for. Two rules keep logically equal filter sets on the same
//! fingerprint:
//!
//! - `IN`/`NOT_IN` filters always carry a sequence; a scalar is wrapped into a one-element list.
//! - Filters are stably sorted by column, then operator, before hashing. Values keep their order.

// std
use std::cmp::Ordering;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Opaque PDP policy object forwarded to the platform as-is.
pub type PolicyDocument = Value;

/// Errors emitted when validating filters.
#[derive(Debug, ThisError)]
pub enum FilterError {
	/// Filters must name a column.
	#[error("Filter column cannot be empty.")]
	EmptyColumn,
	/// The canonical encoding could not be produced.
	#[error("Failed to encode filters for fingerprinting.")]
	Encode(#[source] serde_json::Error),
}

/// Comparison operators understood by the platform's row-level filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
	/// Column value is one of `values`.
	In,
	/// Column value is none of `values`.
	NotIn,
	/// Column equals the value.
	Equals,
	/// Column differs from the value.
	NotEquals,
	/// Column is greater than the value.
	GreaterThan,
	/// Column is greater than or equal to the value.
	GreaterThanEqualsTo,
	/// Column is less than the value.
	LessThan,
	/// Column is less than or equal to the value.
	LessThanEqualsTo,
}
impl FilterOperator {
	/// Returns the wire label of the operator.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::In => "IN",
			Self::NotIn => "NOT_IN",
			Self::Equals => "EQUALS",
			Self::NotEquals => "NOT_EQUALS",
			Self::GreaterThan => "GREATER_THAN",
			Self::GreaterThanEqualsTo => "GREATER_THAN_EQUALS_TO",
			Self::LessThan => "LESS_THAN",
			Self::LessThanEqualsTo => "LESS_THAN_EQUALS_TO",
		}
	}

	/// Membership operators whose values must always be a sequence.
	pub const fn expects_sequence(self) -> bool {
		matches!(self, Self::In | Self::NotIn)
	}
}
impl Display for FilterOperator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Single filter value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterScalar {
	/// Boolean literal.
	Bool(bool),
	/// Numeric literal.
	Number(Number),
	/// String literal.
	Text(String),
}
impl From<&str> for FilterScalar {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<String> for FilterScalar {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<bool> for FilterScalar {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<i64> for FilterScalar {
	fn from(value: i64) -> Self {
		Self::Number(value.into())
	}
}

/// Filter values: either one scalar or an ordered sequence of scalars.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValues {
	/// Ordered sequence of scalars.
	Many(Vec<FilterScalar>),
	/// Bare scalar.
	One(FilterScalar),
}
impl FilterValues {
	/// Returns `true` when the values are already a sequence.
	pub fn is_sequence(&self) -> bool {
		matches!(self, Self::Many(_))
	}

	/// Wraps a bare scalar into a one-element sequence; sequences are returned unchanged.
	pub fn into_sequence(self) -> Self {
		match self {
			Self::One(scalar) => Self::Many(vec![scalar]),
			many => many,
		}
	}
}
impl From<FilterScalar> for FilterValues {
	fn from(value: FilterScalar) -> Self {
		Self::One(value)
	}
}
impl From<&str> for FilterValues {
	fn from(value: &str) -> Self {
		Self::One(value.into())
	}
}
impl From<String> for FilterValues {
	fn from(value: String) -> Self {
		Self::One(value.into())
	}
}
impl From<i64> for FilterValues {
	fn from(value: i64) -> Self {
		Self::One(value.into())
	}
}
impl From<bool> for FilterValues {
	fn from(value: bool) -> Self {
		Self::One(value.into())
	}
}
impl<T> From<Vec<T>> for FilterValues
where
	T: Into<FilterScalar>,
{
	fn from(values: Vec<T>) -> Self {
		Self::Many(values.into_iter().map(Into::into).collect())
	}
}

/// Row-level filter applied to an embedded dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
	/// Column the filter applies to.
	pub column: String,
	/// Comparison operator.
	pub operator: FilterOperator,
	/// Operand(s).
	pub values: FilterValues,
}
impl Filter {
	/// Creates a filter; values are stored as given until [`normalize`](Self::normalize) runs.
	pub fn new(
		column: impl Into<String>,
		operator: FilterOperator,
		values: impl Into<FilterValues>,
	) -> Self {
		Self { column: column.into(), operator, values: values.into() }
	}

	/// Applies the sequence rule for membership operators in place. Idempotent.
	pub fn normalize(&mut self) {
		if self.operator.expects_sequence() && !self.values.is_sequence() {
			let values = std::mem::replace(&mut self.values, FilterValues::Many(Vec::new()));

			self.values = values.into_sequence();
		}
	}

	/// Consuming variant of [`normalize`](Self::normalize).
	pub fn normalized(mut self) -> Self {
		self.normalize();

		self
	}

	fn canonical_cmp(&self, other: &Self) -> Ordering {
		self.column.cmp(&other.column).then(self.operator.cmp(&other.operator))
	}
}

/// Normalizes every filter in place, for identity layers that persist dashboard filters.
pub fn normalize_filters(filters: &mut [Filter]) {
	filters.iter_mut().for_each(Filter::normalize);
}

/// Normalized, canonically ordered access constraints for one embed request.
///
/// Holds the filters and the opaque policy documents forwarded to the platform, plus the
/// base64 (no padding) SHA-256 fingerprint of their canonical JSON encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSet {
	filters: Vec<Filter>,
	policies: Vec<PolicyDocument>,
	fingerprint: String,
}
impl FilterSet {
	/// Normalizes, orders, and fingerprints the provided filters and policies.
	pub fn new<I>(filters: I, policies: Vec<PolicyDocument>) -> Result<Self, FilterError>
	where
		I: IntoIterator<Item = Filter>,
	{
		let mut filters = filters.into_iter().map(Filter::normalized).collect::<Vec<_>>();

		if filters.iter().any(|filter| filter.column.is_empty()) {
			return Err(FilterError::EmptyColumn);
		}

		filters.sort_by(Filter::canonical_cmp);

		let fingerprint = compute_fingerprint(&filters, &policies)?;

		Ok(Self { filters, policies, fingerprint })
	}

	/// Filter set without any row-level restriction.
	pub fn unrestricted() -> Result<Self, FilterError> {
		Self::new([], Vec::new())
	}

	/// Normalized filters in canonical order.
	pub fn filters(&self) -> &[Filter] {
		&self.filters
	}

	/// Policy documents in caller order.
	pub fn policies(&self) -> &[PolicyDocument] {
		&self.policies
	}

	/// Returns `true` when neither filters nor policies restrict the view.
	pub fn is_unrestricted(&self) -> bool {
		self.filters.is_empty() && self.policies.is_empty()
	}

	/// Stable fingerprint stored alongside minted embed tokens.
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}
}

#[derive(Serialize)]
struct CanonicalView<'a> {
	filters: &'a [Filter],
	policies: &'a [PolicyDocument],
}

fn compute_fingerprint(
	filters: &[Filter],
	policies: &[PolicyDocument],
) -> Result<String, FilterError> {
	let encoded =
		serde_json::to_vec(&CanonicalView { filters, policies }).map_err(FilterError::Encode)?;
	let digest = Sha256::digest(&encoded);

	Ok(STANDARD_NO_PAD.encode(digest))
}
