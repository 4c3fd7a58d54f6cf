//! Time sources used for counter expiry and retry hints.

// crates.io
use time::Date;
// self
use crate::_prelude::*;

/// Source of the current UTC instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the instant that should be treated as "now".
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for deterministic expiry tests.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Pins the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Returns `now + delta`, clamped to the latest representable instant instead of overflowing.
pub(crate) fn deadline_after(now: OffsetDateTime, delta: Duration) -> OffsetDateTime {
	now.checked_add(delta).unwrap_or_else(|| Date::MAX.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn manual_clock_is_shared_between_clones() {
		let start = time::macros::datetime!(2025-11-10 12:00 UTC);
		let clock = ManualClock::new(start);
		let observer = clock.clone();

		clock.advance(Duration::seconds(90));

		assert_eq!(observer.now(), start + Duration::seconds(90));

		observer.set(start);

		assert_eq!(clock.now(), start);
	}

	#[test]
	fn deadlines_saturate_instead_of_overflowing() {
		let start = time::macros::datetime!(2025-11-10 12:00 UTC);

		assert_eq!(deadline_after(start, Duration::seconds(300)), start + Duration::seconds(300));
		assert_eq!(
			deadline_after(start, Duration::seconds(i64::MAX)),
			Date::MAX.midnight().assume_utc()
		);
	}
}
