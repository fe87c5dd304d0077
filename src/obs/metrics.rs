// std
use std::time::Instant;
// self
use crate::obs::{FlowKind, FlowOutcome};

/// Meters one flow run: counts the attempt when started, then the outcome and its latency.
///
/// With `metrics` enabled this feeds `servant_login_flow_total{flow,outcome}` and
/// `servant_login_flow_duration_seconds{flow,outcome}`; otherwise it only keeps the clock.
#[must_use = "a started flow should be finished with its outcome"]
#[derive(Debug)]
pub struct FlowMeter {
	kind: FlowKind,
	started: Instant,
}
impl FlowMeter {
	/// Counts an attempt for `kind` and starts the clock.
	pub fn start(kind: FlowKind) -> Self {
		count(kind, FlowOutcome::Attempt);

		Self { kind, started: Instant::now() }
	}

	/// Flow being metered.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Counts the terminal outcome and records the elapsed seconds.
	///
	/// Returns the elapsed seconds so callers can log them alongside the outcome.
	pub fn finish(self, outcome: FlowOutcome) -> f64 {
		debug_assert_ne!(outcome, FlowOutcome::Attempt, "Attempts are counted by `start`.");

		let elapsed = self.started.elapsed().as_secs_f64();

		count(self.kind, outcome);

		#[cfg(feature = "metrics")]
		metrics::histogram!(
			"servant_login_flow_duration_seconds",
			"flow" => self.kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.record(elapsed);

		elapsed
	}
}

fn count(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"servant_login_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}
