//! Optional observability helpers for the limiter, the login gate, and task polling.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named `audit_sentry.guard` with the
//!   `guard` (component) and `stage` (call site) fields, plus warning events for store faults.
//! - Enable `metrics` to increment the `audit_sentry_guard_total` counter for every
//!   attempt/outcome, labeled by `guard` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Components observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardKind {
	/// Attempt counter checks and updates.
	LoginLimiter,
	/// Credential verification wrapped by the limiter.
	LoginGate,
	/// Task status lookups.
	TaskPoller,
}
impl GuardKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GuardKind::LoginLimiter => "login_limiter",
			GuardKind::LoginGate => "login_gate",
			GuardKind::TaskPoller => "task_poller",
		}
	}
}
impl Display for GuardKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GuardOutcome {
	/// Entry to a guarded operation.
	Attempt,
	/// The request may proceed.
	Allowed,
	/// The request was refused by policy.
	Blocked,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Store or backend fault absorbed by the configured failure mode.
	Fault,
}
impl GuardOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GuardOutcome::Attempt => "attempt",
			GuardOutcome::Allowed => "allowed",
			GuardOutcome::Blocked => "blocked",
			GuardOutcome::Success => "success",
			GuardOutcome::Failure => "failure",
			GuardOutcome::Fault => "fault",
		}
	}
}
impl Display for GuardOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
