//! Rate limit policy contracts consulted before an authentication attempt is evaluated.

// self
use crate::{_prelude::*, clock, id::ClientAddress};

/// Boxed future returned by [`RateLimitPolicy::evaluate`].
pub type RateLimitFuture<'a, Error> =
	Pin<Box<dyn Future<Output = Result<RateLimitDecision, Error>> + 'a + Send>>;

/// Strategy that inspects per-client budgets before credentials are checked.
pub trait RateLimitPolicy<Error>
where
	Self: Send + Sync,
{
	/// Evaluates whether the next attempt should be refused.
	fn evaluate<'a>(&'a self, context: &'a RateLimitContext) -> RateLimitFuture<'a, Error>;
}

/// Context shared with a [`RateLimitPolicy`] before an attempt is evaluated.
#[derive(Clone, Debug)]
pub struct RateLimitContext {
	/// Client the attempt originates from.
	pub address: ClientAddress,
	/// Logical operation being attempted.
	pub operation: String,
	/// Timestamp observed before invoking the policy.
	pub observed_at: OffsetDateTime,
}
impl RateLimitContext {
	/// Creates a new context for the given client/operation pair.
	pub fn new(address: ClientAddress, operation: impl Into<String>) -> Self {
		Self { address, operation: operation.into(), observed_at: OffsetDateTime::now_utc() }
	}

	/// Overrides the timestamp associated with the observation.
	pub fn with_observed_at(mut self, instant: OffsetDateTime) -> Self {
		self.observed_at = instant;

		self
	}
}

/// Result emitted by a [`RateLimitPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The attempt may proceed immediately.
	Allow,
	/// The attempt must be refused until the directive allows it.
	Delay(RetryDirective),
}
impl RateLimitDecision {
	/// Returns `true` for [`RateLimitDecision::Allow`].
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Builds a directive that expires `backoff` after `now`.
	pub fn after(now: OffsetDateTime, backoff: Duration) -> Self {
		Self::new(clock::deadline_after(now, backoff), backoff)
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}
