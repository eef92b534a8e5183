// self
use crate::{
	_prelude::*,
	auth::{DashboardId, UserId},
	obs::FlowKind,
};

/// `embed_broker.flow` span; compiles to nothing without the `tracing` feature.
///
/// Besides `flow` and `stage`, the span declares empty `user` and `dashboard` fields that flows
/// fill in once the request is known, so every event below it can be attributed to a key.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"embed_broker.flow",
				flow = kind.as_str(),
				stage,
				user = tracing::field::Empty,
				dashboard = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Records the portal user the flow runs for.
	pub fn record_user(&self, user: &UserId) -> &Self {
		#[cfg(feature = "tracing")]
		self.span.record("user", user.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = user;

		self
	}

	/// Records the dashboard the flow runs for.
	pub fn record_dashboard(&self, dashboard: &DashboardId) -> &Self {
		#[cfg(feature = "tracing")]
		self.span.record("dashboard", dashboard.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = dashboard;

		self
	}

	/// Enters the span for synchronous flows.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { _guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> impl Future<Output = Fut::Output>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Keeps a [`FlowSpan`] entered until dropped.
#[must_use]
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	_guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}
