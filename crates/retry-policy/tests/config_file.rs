//! Loading retry policies from YAML files

mod common;

use common::*;
use retry_policy::{BoxError, ConfigError, RetryPoliciesConfig, RetryPolicy, StrategyKind};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const POLICIES_YAML: &str = r#"
default:
  strategy: exponential
  initial-interval-ms: 5
  max-interval-ms: 20
  max-attempts: 3
operations:
  fetch-index:
    strategy: linear
    interval-ms: 2
    max-attempts: 4
  publish:
    strategy: none
    category: publishing
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("retry.yaml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_policies_from_file() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, POLICIES_YAML);

    let config = RetryPoliciesConfig::from_file(&path).unwrap();
    assert_eq!(config.default.strategy, StrategyKind::Exponential);
    assert_eq!(config.operations.len(), 2);

    let fetch: RetryPolicy<BoxError> = config.builder_for("fetch-index").build().unwrap();
    assert_eq!(fetch.category(), "fetch-index");
    assert_eq!(fetch.max_attempts(), 4);
    assert_eq!(fetch.retry_interval(), Some(Duration::from_millis(2)));

    let publish: RetryPolicy<BoxError> = config.builder_for("publish").build().unwrap();
    assert_eq!(publish.category(), "publishing");
    assert_eq!(publish.max_attempts(), 1);

    let fallback: RetryPolicy<BoxError> = config.builder_for("unknown").build().unwrap();
    assert_eq!(fallback.category(), "unknown");
    assert_eq!(fallback.initial_retry_interval(), Some(Duration::from_millis(5)));
    assert_eq!(fallback.max_retry_interval(), Some(Duration::from_millis(20)));
}

#[test]
fn test_loaded_policy_runs_operations() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, POLICIES_YAML);
    let config = RetryPoliciesConfig::from_file(&path).unwrap();

    let policy: RetryPolicy<TransientError> = config
        .builder_for("fetch-index")
        .classify_with(|e: &TransientError| e.attempt < 10)
        .build()
        .unwrap();
    let clock = AttemptClock::new();

    let result: Result<(), _> = policy.execute(|| {
        let attempt = clock.tick();
        Err(TransientError { attempt })
    });

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 4);
    assert_eq!(clock.count(), 4);
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.yaml");

    let err = RetryPoliciesConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_malformed_file_is_yaml_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "default:\n  max-attempts: [1, 2\n");

    let err = RetryPoliciesConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_zero_attempts_in_file_fails_at_build() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "default:\n  max-attempts: 0\n");

    let config = RetryPoliciesConfig::from_file(&path).unwrap();
    let result: Result<RetryPolicy<BoxError>, _> = config.builder_for("any").build();
    assert!(matches!(result, Err(ConfigError::ZeroMaxAttempts)));
}
