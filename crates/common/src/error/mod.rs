//! Common error types shared by every scifetch crate
//!
//! Two pieces live here:
//!
//! 1. **`CommonError`**: configuration errors raised when a policy is
//!    validated, with the dotted path of the offending field.
//!
//! 2. **`ErrorClassification`**: the interface every error type implements so
//!    retry logic, logging and alerting can treat errors uniformly.
//!
//! Crate-specific errors compose with `CommonError` instead of duplicating it:
//!
//! ```rust,ignore
//! #[derive(Debug, thiserror::Error)]
//! pub enum LoaderError {
//!     #[error("no config file found")]
//!     Missing,
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case |
//! |-------|----------|
//! | **Info** | Expected conditions |
//! | **Warning** | Degraded but operational (rate limiting, open circuit) |
//! | **Error** | Failure requiring attention (bad config, upstream errors) |
//! | **Critical** | Invariant violations |

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised by the shared building blocks
///
/// Only configuration can fail here: runtime rejections (an open circuit, a
/// rate-limit timeout) are reported through the primitives' own result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String, field: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field: Some(field) } => {
                write!(f, "Configuration error in field '{}': {}", field, message)
            }
            Self::Config { message, field: None } => write!(f, "Configuration error: {}", message),
        }
    }
}

impl std::error::Error for CommonError {}

/// Standard interface for classifying errors
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient: timeouts, rate limiting, an open
    /// circuit that will eventually cool down, temporary upstream outages.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific delay is known (e.g. from a
    /// Retry-After header or a circuit cooldown).
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for CommonError {
    /// A bad configuration stays bad on retry.
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl CommonError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    pub fn config_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error handling functionality
    //!
    //! Tests cover display formatting, severity levels, retryability, and
    //! conversions.

    use super::*;

    /// Validates `CommonError::config` behavior for the error config simple
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `err.to_string()` equals `"Configuration error: invalid
    ///   configuration"`.
    /// - Ensures `!err.is_retryable()` evaluates to true.
    /// - Confirms `err.severity()` equals `ErrorSeverity::Error`.
    #[test]
    fn test_error_config_simple() {
        let err = CommonError::config("invalid configuration");
        assert_eq!(err.to_string(), "Configuration error: invalid configuration");
        assert!(!err.is_retryable());
        assert!(!err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_config_with_field() {
        let err = CommonError::config_field("retry.max_attempts", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Configuration error in field 'retry.max_attempts': must be greater than 0"
        );
    }

    #[test]
    fn test_severity_ordering_and_display() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
