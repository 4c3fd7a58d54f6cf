// self
use crate::obs::{GuardKind, GuardOutcome};

/// Records a guard outcome via the global metrics recorder (when enabled).
pub fn record_guard_outcome(kind: GuardKind, outcome: GuardOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"audit_sentry_guard_total",
			"guard" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_guard_outcome_noop_without_recorder() {
		record_guard_outcome(GuardKind::LoginLimiter, GuardOutcome::Blocked);
	}
}
