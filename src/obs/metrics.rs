// self
use crate::obs::{CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"sapphire_access_call_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a cache hit or miss via the global metrics recorder (when enabled).
pub fn record_cache_lookup(hit: bool) {
	#[cfg(feature = "metrics")]
	{
		let result = if hit { "hit" } else { "miss" };

		metrics::counter!("sapphire_access_cache_total", "result" => result).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = hit;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_call_outcome(CallKind::Refresh, CallOutcome::Failure);
		record_cache_lookup(true);
	}
}
