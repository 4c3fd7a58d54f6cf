//! Crate-level error types shared by the limiter, the login gate, stores, and task polling.

// std
use std::time::Duration as StdDuration;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Counter store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary infrastructure failure; retry later.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Malformed client address or task handle.
	#[error(transparent)]
	Identifier(#[from] crate::id::IdentifierError),
	/// Task backend refused a state transition.
	#[error(transparent)]
	Task(#[from] crate::task::TaskTransitionError),
}
impl Error {
	/// Returns `true` when the failure stems from unreachable or slow infrastructure.
	pub fn is_infrastructure_fault(&self) -> bool {
		matches!(self, Self::Storage(_) | Self::Transient(_))
	}
}

/// Awaits `fut` for at most `limit`, mapping an elapsed deadline to [`TransientError::Timeout`].
pub(crate) async fn within<T, E, F>(
	operation: &'static str,
	limit: StdDuration,
	fut: F,
) -> Result<T>
where
	F: Future<Output = Result<T, E>>,
	Error: From<E>,
{
	match tokio::time::timeout(limit, fut).await {
		Ok(result) => result.map_err(Error::from),
		Err(_) => Err(TransientError::Timeout {
			operation,
			after: Duration::try_from(limit).unwrap_or(Duration::MAX),
		}
		.into()),
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is invalid at `{path}`.")]
	InvalidConfig {
		/// Dotted path of the offending field.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Limiter must allow at least one attempt.
	#[error("The max_attempts value must be at least 1.")]
	ZeroMaxAttempts,
	/// Limiter window must be positive.
	#[error("The rate-limit window must be positive.")]
	NonPositiveWindow,
	/// Limiter window exceeds the supported maximum.
	#[error("The rate-limit window must not exceed {max_secs} seconds.")]
	WindowTooLong {
		/// Largest accepted window in seconds.
		max_secs: u64,
	},
	/// Task retention must be positive.
	#[error("The task retention period must be positive.")]
	NonPositiveRetention,
	/// Store or backend timeout must be positive.
	#[error("The {operation} timeout must be positive.")]
	NonPositiveTimeout {
		/// Operation the timeout applies to.
		operation: &'static str,
	},
	/// Counter namespace cannot be empty.
	#[error("The counter namespace cannot be empty.")]
	EmptyNamespace,
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::InvalidConfig { path, source: e.into_inner() }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// A store or backend call did not complete in time.
	#[error("The {operation} call timed out after {after}.")]
	Timeout {
		/// Operation label (e.g. `counter.get`, `task.lookup`).
		operation: &'static str,
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Task backend reported an unavailable dependency.
	#[error("Task backend is unavailable: {message}.")]
	Backend {
		/// Backend-supplied message.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "cache unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.is_infrastructure_fault());
		assert!(error.to_string().contains("cache unreachable"));

		let source = StdError::source(&error).expect("Storage error should expose its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn timeouts_are_infrastructure_faults() {
		let timeout =
			TransientError::Timeout { operation: "counter.get", after: Duration::seconds(2) };
		let error = Error::from(timeout);

		assert!(error.is_infrastructure_fault());
		assert!(error.to_string().contains("counter.get"));

		let config: Error = ConfigError::ZeroMaxAttempts.into();

		assert!(!config.is_infrastructure_fault());
	}
}
