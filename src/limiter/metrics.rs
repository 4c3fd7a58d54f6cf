// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for limiter outcomes.
#[derive(Debug, Default)]
pub struct LimiterMetrics {
	checks: AtomicU64,
	blocked: AtomicU64,
	failures: AtomicU64,
	resets: AtomicU64,
	faults: AtomicU64,
}
impl LimiterMetrics {
	/// Returns the total number of checks performed.
	pub fn checks(&self) -> u64 {
		self.checks.load(Ordering::Relaxed)
	}

	/// Returns the number of checks that refused the attempt.
	pub fn blocked(&self) -> u64 {
		self.blocked.load(Ordering::Relaxed)
	}

	/// Returns the number of failed attempts recorded.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of counters reset after a successful login.
	pub fn resets(&self) -> u64 {
		self.resets.load(Ordering::Relaxed)
	}

	/// Returns the number of counter store faults observed.
	pub fn faults(&self) -> u64 {
		self.faults.load(Ordering::Relaxed)
	}

	pub(crate) fn record_check(&self) {
		self.checks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_blocked(&self) {
		self.blocked.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reset(&self) {
		self.resets.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fault(&self) {
		self.faults.fetch_add(1, Ordering::Relaxed);
	}
}
