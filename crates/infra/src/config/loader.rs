//! Configuration loader
//!
//! Loads the access configuration from a file, then applies environment
//! overrides to the `defaults` policy.
//!
//! ## File Locations
//! When no path is given the loader probes, in order:
//! 1. `./scifetch.toml`
//! 2. `./scifetch.json`
//! 3. `./config/scifetch.toml`
//!
//! If none exists the built-in defaults are used.
//!
//! ## Environment Variables
//! - `SCIFETCH_CACHE_ENABLED`: Response cache on/off (true/false)
//! - `SCIFETCH_CACHE_TTL_MS`: Cache entry lifetime in milliseconds
//! - `SCIFETCH_FALLBACK_ENABLED`: Fallback records on/off (true/false)
//! - `SCIFETCH_RETRY_MAX_ATTEMPTS`: Attempts per request, including the first
//! - `SCIFETCH_ATTEMPT_TIMEOUT_MS`: Per-attempt timeout in milliseconds
//!
//! Overrides only touch `defaults`; listed sources keep their own values.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use scifetch_domain::{AccessConfig, Result, ScifetchError};

use crate::errors::InfraError;

pub const ENV_CACHE_ENABLED: &str = "SCIFETCH_CACHE_ENABLED";
pub const ENV_CACHE_TTL_MS: &str = "SCIFETCH_CACHE_TTL_MS";
pub const ENV_FALLBACK_ENABLED: &str = "SCIFETCH_FALLBACK_ENABLED";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "SCIFETCH_RETRY_MAX_ATTEMPTS";
pub const ENV_ATTEMPT_TIMEOUT_MS: &str = "SCIFETCH_ATTEMPT_TIMEOUT_MS";

/// Load configuration with automatic fallback strategy
///
/// Uses `path` when given, otherwise the first file found by
/// [`probe_config_paths`], otherwise the defaults. Environment overrides
/// are applied last and the result is validated.
///
/// # Errors
/// Returns `ScifetchError::Config` if:
/// - An explicit `path` does not exist
/// - File format is invalid
/// - An override has an invalid value
/// - The resulting configuration fails validation
pub fn load(path: Option<PathBuf>) -> Result<AccessConfig> {
    let config = match path.or_else(probe_config_paths) {
        Some(path) => read_config(&path)?,
        None => {
            tracing::info!("No config file found, using built-in defaults");
            AccessConfig::default()
        }
    };

    let config = apply_env_overrides(config)?;
    validate(&config)?;
    Ok(config)
}

/// Load and validate configuration from a file
///
/// Supports both JSON and TOML formats (detected by file extension). No
/// environment overrides are applied.
///
/// # Errors
/// Returns `ScifetchError::Config` if the file is missing, unreadable,
/// malformed or fails validation.
pub fn load_from_file(path: &Path) -> Result<AccessConfig> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<AccessConfig> {
    if !path.exists() {
        return Err(ScifetchError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents =
        std::fs::read_to_string(path).map_err(|err| ScifetchError::from(InfraError::from(err)))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AccessConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ScifetchError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ScifetchError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(ScifetchError::Config(format!("Unsupported config format: {}", extension))),
    }
}

fn validate(config: &AccessConfig) -> Result<()> {
    config.validate().map_err(|e| ScifetchError::Config(e.to_string()))
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    [
        cwd.join("scifetch.toml"),
        cwd.join("scifetch.json"),
        cwd.join("config").join("scifetch.toml"),
    ]
    .into_iter()
    .find(|path| path.exists())
}

/// Apply `SCIFETCH_*` environment overrides to the `defaults` policy
///
/// # Errors
/// Returns `ScifetchError::Config` if a numeric variable does not parse.
pub fn apply_env_overrides(config: AccessConfig) -> Result<AccessConfig> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(
    mut config: AccessConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AccessConfig> {
    let defaults = &mut config.defaults;

    if let Some(enabled) = lookup(ENV_CACHE_ENABLED) {
        defaults.cache.enabled = parse_bool(&enabled);
    }
    if let Some(ttl) = lookup(ENV_CACHE_TTL_MS) {
        defaults.cache.ttl = Duration::from_millis(parse_number(ENV_CACHE_TTL_MS, &ttl)?);
    }
    if let Some(enabled) = lookup(ENV_FALLBACK_ENABLED) {
        defaults.fallback.enabled = parse_bool(&enabled);
    }
    if let Some(attempts) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
        defaults.retry.max_attempts = parse_number(ENV_RETRY_MAX_ATTEMPTS, &attempts)?;
    }
    if let Some(timeout) = lookup(ENV_ATTEMPT_TIMEOUT_MS) {
        defaults.attempt_timeout =
            Duration::from_millis(parse_number(ENV_ATTEMPT_TIMEOUT_MS, &timeout)?);
    }

    Ok(config)
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ScifetchError::Config(format!("Invalid value for {}: {}", key, e)))
}

/// Parse a boolean override
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Anything else reads as `false`.
fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
