//! Optional observability helpers for login flows and API calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `servant_login.flow` with the `flow` and
//!   `stage` (call site) fields, plus a `warn` event for every failed flow.
//! - Enable `metrics` to count every attempt and outcome in `servant_login_flow_total` and to
//!   record run latency in the `servant_login_flow_duration_seconds` histogram, both labeled by
//!   `flow` and `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Server-side login handler (token exchange followed by identity fetch).
	Login,
	/// Client-side login initiation.
	Initiate,
	/// Pending credential retrieval.
	Retrieve,
	/// Servant REST API call outside the login handler.
	Api,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Initiate => "initiate",
			FlowKind::Retrieve => "retrieve",
			FlowKind::Api => "api",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Closes `meter` with the outcome of `result` and reports failures.
pub fn finish_flow<T>(meter: FlowMeter, stage: &'static str, result: &Result<T>) {
	let kind = meter.kind();

	match result {
		Ok(_) => {
			meter.finish(FlowOutcome::Success);
		},
		Err(e) => {
			meter.finish(FlowOutcome::Failure);
			report_flow_failure(kind, stage, e);
		},
	}
}
