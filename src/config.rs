//! Aggregate configuration document for the limiter, the task poller, and the task backend.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	limiter::LimiterConfig,
	task::{BackendConfig, PollerConfig},
};

/// Top-level configuration; every field falls back to its default when omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentryConfig {
	/// Login limiter settings.
	pub limiter: LimiterConfig,
	/// Task poller settings.
	pub poller: PollerConfig,
	/// In-process task backend settings.
	pub backend: BackendConfig,
}
impl SentryConfig {
	/// Parses and validates a JSON document, reporting the path of the first offending field.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)?;

		config.validate()?;

		Ok(config)
	}

	/// Validates every section.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.limiter.validate()?;
		self.poller.validate()?;
		self.backend.validate()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::limiter::FailureMode;

	#[test]
	fn empty_document_yields_defaults() {
		let config = SentryConfig::from_json_str("{}").expect("Empty config should parse.");

		assert_eq!(config, SentryConfig::default());
	}

	#[test]
	fn partial_sections_keep_remaining_defaults() {
		let config = SentryConfig::from_json_str(
			r#"{"limiter":{"max_attempts":3,"failure_mode":"closed"},"poller":{"lookup_timeout_ms":500}}"#,
		)
		.expect("Partial config should parse.");

		assert_eq!(config.limiter.max_attempts, 3);
		assert_eq!(config.limiter.failure_mode, FailureMode::Closed);
		assert_eq!(config.limiter.window_secs, 300);
		assert_eq!(config.poller.lookup_timeout_ms, 500);
		assert_eq!(config.backend.retention_secs, BackendConfig::DEFAULT_RETENTION_SECS);
	}

	#[test]
	fn parse_errors_name_the_offending_field() {
		let err = SentryConfig::from_json_str(r#"{"limiter":{"failure_mode":"sideways"}}"#)
			.expect_err("Unknown failure mode should be rejected.");

		match err {
			ConfigError::InvalidConfig { path, .. } => assert_eq!(path, "limiter.failure_mode"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn semantic_validation_runs_after_parsing() {
		let err = SentryConfig::from_json_str(r#"{"limiter":{"max_attempts":0}}"#)
			.expect_err("Zero attempts should be rejected.");

		assert!(matches!(err, ConfigError::ZeroMaxAttempts));
	}

	#[test]
	fn out_of_range_window_is_rejected_before_use() {
		let raw = r#"{"limiter":{"window_secs":18446744073709551615}}"#;
		let err = SentryConfig::from_json_str(raw)
			.expect_err("A window of u64::MAX seconds should be rejected.");

		assert!(matches!(err, ConfigError::WindowTooLong { .. }));
	}
}
