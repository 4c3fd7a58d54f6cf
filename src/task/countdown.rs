//! Demo job that simulates a long-running process one step at a time.

// std
use std::time::Duration as StdDuration;
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	task::{ProgressReporter, TaskJob},
};

/// Reports `PROGRESS(i, duration)` before each of `duration` steps, then succeeds with
/// `"Completed {duration} second task"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountdownJob {
	/// Number of steps.
	pub duration: u64,
	/// Wall time spent per step.
	pub step: StdDuration,
}
impl CountdownJob {
	/// One-second steps.
	pub const fn new(duration: u64) -> Self {
		Self { duration, step: StdDuration::from_secs(1) }
	}

	/// Overrides the per-step delay.
	pub const fn with_step(mut self, step: StdDuration) -> Self {
		self.step = step;

		self
	}
}
impl Default for CountdownJob {
	fn default() -> Self {
		Self::new(5)
	}
}
impl TaskJob for CountdownJob {
	fn name(&self) -> &'static str {
		"countdown"
	}

	fn run(
		self,
		reporter: ProgressReporter,
	) -> impl Future<Output = Result<Value, String>> + Send + 'static {
		async move {
			for current in 0..self.duration {
				reporter.report(current, self.duration).map_err(|e| e.to_string())?;
				tokio::time::sleep(self.step).await;
			}

			Ok(Value::String(format!("Completed {} second task", self.duration)))
		}
	}
}
