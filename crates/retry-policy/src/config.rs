//! Declarative retry policy configuration
//!
//! Policies can be described in YAML and turned into [`RetryPolicy`]
//! values at startup:
//!
//! ```yaml
//! default:
//!   strategy: exponential
//!   initial-interval-ms: 200
//!   max-interval-ms: 10000
//! operations:
//!   download:
//!     strategy: linear
//!     interval-ms: 500
//!     timeout-ms: 1500
//! ```
//!
//! Every field has a default, so an empty document is valid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::error::ConfigError;
use crate::policy::{RetryPolicy, RetryPolicyBuilder};

/// Backoff shape selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Single attempt
    None,

    /// Fixed interval
    Linear,

    /// Doubling interval (default)
    #[default]
    Exponential,
}

/// Configuration of a single retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicyConfig {
    /// Backoff shape
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Attempt limit; derived from the timeout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    /// Interval of a linear policy, in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// First interval of an exponential policy, in milliseconds
    #[serde(default = "default_interval")]
    pub initial_interval_ms: u64,

    /// Interval cap of an exponential policy, in milliseconds
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,

    /// Run timeout in milliseconds; negative means none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i64>,

    /// Category used in log events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            max_attempts: None,
            interval_ms: default_interval(),
            initial_interval_ms: default_interval(),
            max_interval_ms: default_max_interval(),
            timeout_ms: None,
            category: None,
        }
    }
}

fn default_interval() -> u64 {
    1000
}
fn default_max_interval() -> u64 {
    30000
}

impl RetryPolicyConfig {
    /// Parse a single policy from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Backoff shape described by this configuration
    pub fn backoff(&self) -> Backoff {
        match self.strategy {
            StrategyKind::None => Backoff::None,
            StrategyKind::Linear => Backoff::linear(Duration::from_millis(self.interval_ms)),
            StrategyKind::Exponential => Backoff::Exponential {
                initial: Duration::from_millis(self.initial_interval_ms),
                max: Duration::from_millis(self.max_interval_ms),
            },
        }
    }

    /// Run timeout, with negative values meaning none
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .and_then(|ms| u64::try_from(ms).ok())
            .map(Duration::from_millis)
    }

    /// Builder preloaded with this configuration
    ///
    /// Attach a classifier before building; the default treats every
    /// error as transient.
    pub fn builder<E>(&self) -> RetryPolicyBuilder<E> {
        let mut builder = RetryPolicyBuilder::new(self.backoff()).timeout_opt(self.timeout());
        if let Some(max_attempts) = self.max_attempts {
            builder = builder.max_attempts(max_attempts);
        }
        if let Some(category) = &self.category {
            builder = builder.category(category.clone());
        }
        builder
    }

    /// Build a policy that treats every error as transient
    pub fn build<E>(&self) -> Result<RetryPolicy<E>, ConfigError> {
        self.builder().build()
    }
}

/// A default policy plus per-operation overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Policy for operations without an override
    #[serde(default)]
    pub default: RetryPolicyConfig,

    /// Per-operation policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicyConfig>,
}

impl RetryPoliciesConfig {
    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_yaml_str(&content)
    }

    /// Configuration for `operation`, falling back to the default
    pub fn policy_for(&self, operation: &str) -> &RetryPolicyConfig {
        self.operations.get(operation).unwrap_or(&self.default)
    }

    /// Builder for `operation`
    ///
    /// The category defaults to the operation name when the configuration
    /// does not set one.
    pub fn builder_for<E>(&self, operation: &str) -> RetryPolicyBuilder<E> {
        let config = self.policy_for(operation);
        let builder = config.builder();
        match config.category {
            Some(_) => builder,
            None => builder.category(operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DEFAULT_MAX_ATTEMPTS, UNBOUNDED_ATTEMPTS};
    use std::io;

    #[test]
    fn test_defaults() {
        let config = RetryPolicyConfig::default();
        assert_eq!(config.strategy, StrategyKind::Exponential);
        assert_eq!(config.initial_interval_ms, 1000);
        assert_eq!(config.max_interval_ms, 30000);
        assert_eq!(config.timeout(), None);

        let policy: RetryPolicy<io::Error> = config.build().unwrap();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.initial_retry_interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let config = RetryPoliciesConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RetryPoliciesConfig::default());
    }

    #[test]
    fn test_parse_linear_with_timeout() {
        let config = RetryPolicyConfig::from_yaml_str(
            "strategy: linear\ninterval-ms: 500\ntimeout-ms: 1500\n",
        )
        .unwrap();

        let policy: RetryPolicy<io::Error> = config.build().unwrap();
        assert_eq!(policy.retry_interval(), Some(Duration::from_millis(500)));
        assert_eq!(policy.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(policy.max_attempts(), UNBOUNDED_ATTEMPTS);
    }

    #[test]
    fn test_negative_timeout_means_none() {
        let config = RetryPolicyConfig::from_yaml_str("timeout-ms: -1\n").unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_zero_max_attempts_rejected_at_build() {
        let config = RetryPolicyConfig::from_yaml_str("max-attempts: 0\n").unwrap();
        let result: Result<RetryPolicy<io::Error>, _> = config.build();
        assert!(matches!(result, Err(ConfigError::ZeroMaxAttempts)));
    }

    #[test]
    fn test_unknown_strategy_is_yaml_error() {
        let result = RetryPolicyConfig::from_yaml_str("strategy: fibonacci\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_operation_lookup_and_category() {
        let config = RetryPoliciesConfig::from_yaml_str(
            r#"
default:
  strategy: none
operations:
  download:
    strategy: linear
    interval-ms: 250
    max-attempts: 4
  upload:
    category: uploads
"#,
        )
        .unwrap();

        assert_eq!(config.policy_for("missing").strategy, StrategyKind::None);

        let download: RetryPolicy<io::Error> = config.builder_for("download").build().unwrap();
        assert_eq!(download.category(), "download");
        assert_eq!(download.max_attempts(), 4);
        assert_eq!(download.retry_interval(), Some(Duration::from_millis(250)));

        let upload: RetryPolicy<io::Error> = config.builder_for("upload").build().unwrap();
        assert_eq!(upload.category(), "uploads");

        let other: RetryPolicy<io::Error> = config.builder_for("other").build().unwrap();
        assert_eq!(other.max_attempts(), 1);
    }

    #[test]
    fn test_round_trip_serialization() {
        let config = RetryPolicyConfig {
            strategy: StrategyKind::Linear,
            max_attempts: Some(3),
            timeout_ms: Some(2000),
            ..Default::default()
        };
        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        assert!(yaml.contains("strategy: linear"));
        assert!(yaml.contains("max-attempts: 3"));
        assert_eq!(RetryPolicyConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
