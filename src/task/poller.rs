//! Pull-based status queries over a [`TaskBackend`].

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	error::{self, ConfigError},
	id::TaskHandle,
	obs::{self, GuardKind, GuardOutcome, GuardSpan},
	task::{TaskBackend, TaskState, TaskStatus},
};

const KIND: GuardKind = GuardKind::TaskPoller;

/// Tunables for [`TaskPoller`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollerConfig {
	/// Upper bound for each backend lookup.
	pub lookup_timeout_ms: u64,
}
impl PollerConfig {
	/// Default lookup timeout in milliseconds.
	pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 2_000;

	/// Overrides the lookup timeout.
	pub fn with_lookup_timeout_ms(mut self, lookup_timeout_ms: u64) -> Self {
		self.lookup_timeout_ms = lookup_timeout_ms;

		self
	}

	/// Lookup timeout as a std duration suitable for the runtime timer.
	pub fn lookup_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.lookup_timeout_ms)
	}

	/// Rejects a zero timeout.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.lookup_timeout_ms == 0 {
			return Err(ConfigError::NonPositiveTimeout { operation: "task lookup" });
		}

		Ok(())
	}
}
impl Default for PollerConfig {
	fn default() -> Self {
		Self { lookup_timeout_ms: Self::DEFAULT_LOOKUP_TIMEOUT_MS }
	}
}

/// Answers status queries for submitted tasks; each query is a single bounded lookup.
#[derive(Clone)]
pub struct TaskPoller {
	backend: Arc<dyn TaskBackend>,
	config: PollerConfig,
}
impl TaskPoller {
	/// Creates a poller over `backend`.
	pub fn new(backend: Arc<dyn TaskBackend>, config: PollerConfig) -> Self {
		Self { backend, config }
	}

	/// Looks up the current status of `handle` without waiting for completion.
	///
	/// Unknown handles yield [`TaskState::Unknown`]. A lookup exceeding the configured timeout
	/// fails with a transient error.
	pub async fn get_status(&self, handle: &TaskHandle) -> Result<TaskStatus> {
		let span = GuardSpan::new(KIND, "get_status");

		obs::record_guard_outcome(KIND, GuardOutcome::Attempt);

		let result = span
			.instrument(async move {
				let record = error::within(
					"task.lookup",
					self.config.lookup_timeout(),
					self.backend.lookup(handle),
				)
				.await?;

				Ok(match record {
					Some(record) => TaskStatus::from(&record.phase),
					None => TaskStatus::unknown(),
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_guard_outcome(KIND, GuardOutcome::Success),
			Err(err) => {
				obs::record_guard_outcome(KIND, GuardOutcome::Failure);
				obs::warn_fault(KIND, "get_status", handle, err);
			},
		}

		result
	}

	/// Same as [`TaskPoller::get_status`] for a raw, caller-supplied handle.
	///
	/// Malformed handles cannot name a submitted task, so they report [`TaskState::Unknown`]
	/// without touching the backend.
	pub async fn get_status_raw(&self, raw: &str) -> Result<TaskStatus> {
		match TaskHandle::new(raw) {
			Ok(handle) => self.get_status(&handle).await,
			Err(_) => {
				obs::debug_event(KIND, raw, "malformed task handle");

				Ok(TaskStatus::unknown())
			},
		}
	}

	/// Re-issues [`TaskPoller::get_status`] every `interval` until the task is terminal or unknown.
	///
	/// `on_status` sees every observation, including the final one, which is also returned.
	pub async fn watch<F>(
		&self,
		handle: &TaskHandle,
		interval: StdDuration,
		mut on_status: F,
	) -> Result<TaskStatus>
	where
		F: FnMut(&TaskStatus),
	{
		loop {
			let status = self.get_status(handle).await?;

			on_status(&status);

			if status.state.is_terminal() || status.state == TaskState::Unknown {
				return Ok(status);
			}

			tokio::time::sleep(interval).await;
		}
	}
}
impl Debug for TaskPoller {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TaskPoller").field("config", &self.config).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::task::{BackendFuture, TaskRecord};

	struct Stalled;
	impl TaskBackend for Stalled {
		fn lookup<'a>(&'a self, _: &'a TaskHandle) -> BackendFuture<'a, Option<TaskRecord>> {
			Box::pin(std::future::pending())
		}
	}

	#[test]
	fn default_config_validates() {
		PollerConfig::default().validate().expect("Default poller config should validate.");

		assert!(PollerConfig::default().with_lookup_timeout_ms(0).validate().is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn stalled_backend_times_out() {
		let poller = TaskPoller::new(Arc::new(Stalled), PollerConfig::default());
		let err = poller
			.get_status(&TaskHandle::generate())
			.await
			.expect_err("Stalled lookup should time out.");

		assert!(err.is_infrastructure_fault());
		assert!(err.to_string().contains("task.lookup"));
	}

	#[tokio::test]
	async fn malformed_handles_are_unknown() {
		let poller = TaskPoller::new(Arc::new(Stalled), PollerConfig::default());
		let status = poller
			.get_status_raw("not a handle")
			.await
			.expect("Malformed handle should not error.");

		assert_eq!(status, TaskStatus::unknown());
	}
}
