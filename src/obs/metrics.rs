// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder and the tracing subscriber (when
/// enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"embed_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(flow = kind.as_str(), outcome = outcome.as_str(), "embed broker flow outcome");
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_without_a_recorder_is_a_noop() {
		record_flow_outcome(FlowKind::EmbedToken, FlowOutcome::CacheHit);
		record_flow_outcome(FlowKind::AccessToken, FlowOutcome::Failure);
	}
}
