//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;
use std::time::Duration;

use scifetch_domain::{EndpointKey, ScifetchError};
use scifetch_infra::config;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_toml_file() -> anyhow::Result<()> {
    let toml_content = r#"
[defaults.retry]
max_attempts = 4
base_delay_ms = 250

[sources.chembl.rate_limit]
max_calls = 5
period_ms = 1000

[sources.chembl.cache]
enabled = true
ttl_ms = 60000

[sources.chembl.fallback]
enabled = true
"#;

    let mut temp_file = NamedTempFile::with_suffix(".toml")?;
    temp_file.write_all(toml_content.as_bytes())?;

    let config = config::load_from_file(temp_file.path())?;

    assert_eq!(config.defaults.retry.max_attempts, 4);
    assert_eq!(config.defaults.retry.base_delay, Duration::from_millis(250));

    let chembl = EndpointKey::new("chembl", "www.ebi.ac.uk", "/chembl/api/data/molecule");
    let policy = config.policy_for(&chembl);
    assert_eq!(policy.rate_limit.max_calls, 5);
    assert_eq!(policy.rate_limit.period, Duration::from_secs(1));
    assert!(policy.cache.enabled);
    assert_eq!(policy.cache.ttl, Duration::from_secs(60));
    assert!(policy.fallback.enabled);

    let other = EndpointKey::new("pubchem", "pubchem.ncbi.nlm.nih.gov", "/rest/pug");
    assert_eq!(config.policy_for(&other).retry.max_attempts, 4);
    Ok(())
}

#[test]
fn test_load_config_from_json_file() -> anyhow::Result<()> {
    let json_content = r#"{
        "defaults": {
            "attempt_timeout_ms": 5000,
            "circuit_breaker": { "failure_threshold": 3 }
        },
        "sources": {
            "uniprot": { "retry": { "max_attempts": 2 } }
        }
    }"#;

    let mut temp_file = NamedTempFile::with_suffix(".json")?;
    temp_file.write_all(json_content.as_bytes())?;

    let config = config::load_from_file(temp_file.path())?;

    assert_eq!(config.defaults.attempt_timeout, Duration::from_secs(5));
    assert_eq!(config.defaults.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.sources["uniprot"].retry.max_attempts, 2);
    Ok(())
}

#[test]
fn test_invalid_toml_is_config_error() -> anyhow::Result<()> {
    let mut temp_file = NamedTempFile::with_suffix(".toml")?;
    temp_file.write_all(b"[defaults.retry\nmax_attempts = ")?;

    let err = config::load_from_file(temp_file.path()).unwrap_err();
    assert!(matches!(err, ScifetchError::Config(msg) if msg.contains("TOML")));
    Ok(())
}

/// Validates that `load` applies environment overrides on top of the file.
///
/// Assertions:
/// - Confirms an override replaces the file's value for `defaults`.
/// - Confirms values not overridden come from the file.
#[test]
fn test_load_applies_env_overrides() -> anyhow::Result<()> {
    let mut temp_file = NamedTempFile::with_suffix(".toml")?;
    temp_file.write_all(b"[defaults.retry]\nmax_attempts = 4\n\n[defaults.cache]\nttl_ms = 1000\n")?;

    std::env::set_var("SCIFETCH_CACHE_ENABLED", "true");
    let loaded = config::load(Some(temp_file.path().to_path_buf()));
    std::env::remove_var("SCIFETCH_CACHE_ENABLED");

    let config = loaded?;
    assert!(config.defaults.cache.enabled);
    assert_eq!(config.defaults.cache.ttl, Duration::from_secs(1));
    assert_eq!(config.defaults.retry.max_attempts, 4);
    Ok(())
}

#[test]
fn test_explicit_missing_path_fails() {
    let err = config::load(Some("/nonexistent/scifetch.toml".into())).unwrap_err();
    assert!(matches!(err, ScifetchError::Config(_)));
}
