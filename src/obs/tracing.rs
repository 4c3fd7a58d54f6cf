// self
use crate::{_prelude::*, obs::GuardKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedGuard<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedGuard<F> = F;

/// A span builder used by guarded operations.
#[derive(Clone, Debug)]
pub struct GuardSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GuardSpan {
	/// Creates a new span tagged with the provided guard kind + stage.
	pub fn new(kind: GuardKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("audit_sentry.guard", guard = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedGuard<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs a store or backend fault that the caller chose to absorb.
pub fn warn_fault(kind: GuardKind, stage: &'static str, subject: &str, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			guard = kind.as_str(),
			stage,
			subject,
			error = %error,
			"guard dependency fault"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, stage, subject, error);
	}
}

/// Logs a policy refusal (e.g. too many login attempts).
pub fn info_blocked(kind: GuardKind, subject: &str, count: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(guard = kind.as_str(), subject, count, "request blocked by policy");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, subject, count);
	}
}

/// Logs a routine state change at debug level.
pub fn debug_event(kind: GuardKind, subject: &str, message: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(guard = kind.as_str(), subject, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, subject, message);
	}
}
