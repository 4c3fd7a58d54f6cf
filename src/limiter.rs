//! Fixed-window limiter for failed login attempts, keyed by client address.
//!
//! Every failed attempt bumps an attempt counter in the shared [`CounterStore`]. The first failure
//! creates the counter with the configured window as its expiry; later failures increment it in
//! place, so the window stays anchored at the first failure instead of sliding. Once the counter
//! reaches `max_attempts`, [`LoginRateLimiter::check`] refuses further attempts until the counter
//! expires or [`LoginRateLimiter::reset`] deletes it after a successful login.
//!
//! Store faults during a check are resolved by the configured [`FailureMode`] and always logged.

mod metrics;

pub use metrics::LimiterMetrics;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	error::{self, ConfigError},
	ext::{RateLimitContext, RateLimitDecision, RateLimitFuture, RateLimitPolicy, RetryDirective},
	id::ClientAddress,
	obs::{self, GuardKind, GuardOutcome, GuardSpan},
	store::{CounterKey, CounterStore},
};

const KIND: GuardKind = GuardKind::LoginLimiter;

/// How [`LoginRateLimiter::check`] resolves an unreachable or slow counter store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
	/// Allow the attempt and log the fault.
	#[default]
	Open,
	/// Refuse the attempt and log the fault.
	Closed,
}

/// Tunables for [`LoginRateLimiter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimiterConfig {
	/// Prefix prepended to the client address to build the counter key.
	pub namespace: String,
	/// Attempts are refused once the counter reaches this value.
	pub max_attempts: u64,
	/// Lifetime of a counter, measured from the first failure.
	pub window_secs: u64,
	/// Upper bound for each counter store call.
	pub store_timeout_ms: u64,
	/// Behavior when the counter store cannot be reached during a check.
	pub failure_mode: FailureMode,
}
impl LimiterConfig {
	/// Default counter namespace.
	pub const DEFAULT_NAMESPACE: &'static str = "login_attempts_";
	/// Default attempt ceiling.
	pub const DEFAULT_MAX_ATTEMPTS: u64 = 5;
	/// Default window length in seconds.
	pub const DEFAULT_WINDOW_SECS: u64 = 300;
	/// Default store timeout in milliseconds.
	pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
	/// Longest accepted window (one year).
	pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

	/// Overrides the counter namespace.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();

		self
	}

	/// Overrides the attempt ceiling.
	pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
		self.max_attempts = max_attempts;

		self
	}

	/// Overrides the window length.
	pub fn with_window_secs(mut self, window_secs: u64) -> Self {
		self.window_secs = window_secs;

		self
	}

	/// Overrides the store timeout.
	pub fn with_store_timeout_ms(mut self, store_timeout_ms: u64) -> Self {
		self.store_timeout_ms = store_timeout_ms;

		self
	}

	/// Overrides the failure mode.
	pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
		self.failure_mode = failure_mode;

		self
	}

	/// Window as a [`Duration`].
	pub fn window(&self) -> Duration {
		Duration::seconds(i64::try_from(self.window_secs).unwrap_or(i64::MAX))
	}

	/// Store timeout as a std duration suitable for the runtime timer.
	pub fn store_timeout(&self) -> StdDuration {
		StdDuration::from_millis(self.store_timeout_ms)
	}

	/// Rejects configurations that would make the limiter meaningless.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.namespace.is_empty() {
			return Err(ConfigError::EmptyNamespace);
		}
		if self.max_attempts == 0 {
			return Err(ConfigError::ZeroMaxAttempts);
		}
		if self.window_secs == 0 {
			return Err(ConfigError::NonPositiveWindow);
		}
		if self.window_secs > Self::MAX_WINDOW_SECS {
			return Err(ConfigError::WindowTooLong { max_secs: Self::MAX_WINDOW_SECS });
		}
		if self.store_timeout_ms == 0 {
			return Err(ConfigError::NonPositiveTimeout { operation: "counter store" });
		}

		Ok(())
	}
}
impl Default for LimiterConfig {
	fn default() -> Self {
		Self {
			namespace: Self::DEFAULT_NAMESPACE.into(),
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			window_secs: Self::DEFAULT_WINDOW_SECS,
			store_timeout_ms: Self::DEFAULT_STORE_TIMEOUT_MS,
			failure_mode: FailureMode::Open,
		}
	}
}

/// Outcome of [`LoginRateLimiter::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptCheck {
	/// Whether a new attempt may proceed.
	pub allowed: bool,
	/// Failures recorded in the current window (zero when the store could not be read).
	pub current_count: u64,
	/// Set when the store faulted and the [`FailureMode`] decided the outcome.
	pub store_fault: bool,
	/// Retry hint for refused attempts.
	pub retry: Option<RetryDirective>,
}

/// Caps failed authentication attempts per client address.
#[derive(Clone)]
pub struct LoginRateLimiter {
	store: Arc<dyn CounterStore>,
	config: LimiterConfig,
	clock: Arc<dyn Clock>,
	/// Shared in-process counters for limiter outcomes.
	pub metrics: Arc<LimiterMetrics>,
}
impl LoginRateLimiter {
	/// Creates a limiter over `store`.
	///
	/// The configuration is used as given; call [`LimiterConfig::validate`] or
	/// [`LoginRateLimiter::try_new`] when it comes from an untrusted source.
	pub fn new(store: Arc<dyn CounterStore>, config: LimiterConfig) -> Self {
		Self { store, config, clock: Arc::new(SystemClock), metrics: Default::default() }
	}

	/// Validates `config` before creating the limiter.
	pub fn try_new(store: Arc<dyn CounterStore>, config: LimiterConfig) -> Result<Self> {
		config.validate()?;

		Ok(Self::new(store, config))
	}

	/// Replaces the clock used for retry hints.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &LimiterConfig {
		&self.config
	}

	/// Counter key used for `address`.
	pub fn key_for(&self, address: &ClientAddress) -> CounterKey {
		CounterKey::new(&self.config.namespace, address)
	}

	/// Reads the attempt counter for `address` and decides whether a new attempt may proceed.
	pub async fn check(&self, address: &ClientAddress) -> AttemptCheck {
		let span = GuardSpan::new(KIND, "check");

		obs::record_guard_outcome(KIND, GuardOutcome::Attempt);
		self.metrics.record_check();

		span.instrument(async move {
			let key = self.key_for(address);
			let count = match error::within(
				"counter.get",
				self.config.store_timeout(),
				self.store.get(&key),
			)
			.await
			{
				Ok(count) => count,
				Err(err) => return self.resolve_fault(address, &err),
			};

			if count < self.config.max_attempts {
				obs::record_guard_outcome(KIND, GuardOutcome::Allowed);

				return AttemptCheck {
					allowed: true,
					current_count: count,
					store_fault: false,
					retry: None,
				};
			}

			self.metrics.record_blocked();
			obs::record_guard_outcome(KIND, GuardOutcome::Blocked);
			obs::info_blocked(KIND, address, count);

			AttemptCheck {
				allowed: false,
				current_count: count,
				store_fault: false,
				retry: Some(self.retry_directive(&key).await),
			}
		})
		.await
	}

	/// Records a failed attempt for `address` and returns the updated count.
	pub async fn record_failure(&self, address: &ClientAddress) -> Result<u64> {
		let span = GuardSpan::new(KIND, "record_failure");

		span.instrument(async move {
			let key = self.key_for(address);
			let count = error::within(
				"counter.increment",
				self.config.store_timeout(),
				self.store.increment(&key, self.config.window()),
			)
			.await
			.inspect_err(|_| {
				self.metrics.record_fault();
				obs::record_guard_outcome(KIND, GuardOutcome::Failure);
			})?;

			self.metrics.record_failure();
			obs::debug_event(KIND, address, "failed attempt recorded");

			Ok(count)
		})
		.await
	}

	/// Deletes the attempt counter for `address` after a successful login.
	///
	/// Returns whether a live counter was removed.
	pub async fn reset(&self, address: &ClientAddress) -> Result<bool> {
		let span = GuardSpan::new(KIND, "reset");

		span.instrument(async move {
			let key = self.key_for(address);
			let removed = error::within(
				"counter.delete",
				self.config.store_timeout(),
				self.store.delete(&key),
			)
			.await
			.inspect_err(|_| {
				self.metrics.record_fault();
				obs::record_guard_outcome(KIND, GuardOutcome::Failure);
			})?;

			self.metrics.record_reset();
			obs::debug_event(KIND, address, "attempt counter reset");

			Ok(removed)
		})
		.await
	}

	/// Remaining lifetime of the attempt counter for `address`, if one is live.
	pub async fn remaining_window(&self, address: &ClientAddress) -> Result<Option<Duration>> {
		let key = self.key_for(address);

		error::within("counter.ttl", self.config.store_timeout(), self.store.ttl(&key)).await
	}

	fn resolve_fault(&self, address: &ClientAddress, err: &Error) -> AttemptCheck {
		self.metrics.record_fault();
		obs::record_guard_outcome(KIND, GuardOutcome::Fault);
		obs::warn_fault(KIND, "check", address, err);

		match self.config.failure_mode {
			FailureMode::Open =>
				AttemptCheck { allowed: true, current_count: 0, store_fault: true, retry: None },
			FailureMode::Closed => {
				self.metrics.record_blocked();

				AttemptCheck {
					allowed: false,
					current_count: 0,
					store_fault: true,
					retry: Some(
						RetryDirective::after(self.clock.now(), self.config.window())
							.with_reason("Attempt counter store is unavailable."),
					),
				}
			},
		}
	}

	async fn retry_directive(&self, key: &CounterKey) -> RetryDirective {
		let backoff =
			match error::within("counter.ttl", self.config.store_timeout(), self.store.ttl(key))
				.await
			{
				Ok(Some(remaining)) => remaining,
				Ok(None) | Err(_) => self.config.window(),
			};

		RetryDirective::after(self.clock.now(), backoff).with_reason("Too many login attempts.")
	}
}
impl Debug for LoginRateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRateLimiter").field("config", &self.config).finish()
	}
}
impl RateLimitPolicy<Error> for LoginRateLimiter {
	fn evaluate<'a>(&'a self, context: &'a RateLimitContext) -> RateLimitFuture<'a, Error> {
		Box::pin(async move {
			let check = self.check(&context.address).await;

			if check.allowed {
				return Ok(RateLimitDecision::Allow);
			}

			let directive = check.retry.unwrap_or_else(|| {
				RetryDirective::after(context.observed_at, self.config.window())
			});

			Ok(RateLimitDecision::Delay(directive))
		})
	}
}
