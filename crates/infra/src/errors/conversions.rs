//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use scifetch_domain::ScifetchError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ScifetchError);

impl From<InfraError> for ScifetchError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ScifetchError> for InfraError {
    fn from(value: ScifetchError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoScifetchError {
    fn into_scifetch(self) -> ScifetchError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → ScifetchError */
/* -------------------------------------------------------------------------- */

impl IntoScifetchError for std::io::Error {
    fn into_scifetch(self) -> ScifetchError {
        match self.kind() {
            std::io::ErrorKind::NotFound => {
                ScifetchError::Config(format!("config file not found: {self}"))
            }
            std::io::ErrorKind::PermissionDenied => {
                ScifetchError::Config(format!("config file not readable: {self}"))
            }
            _ => ScifetchError::Internal(format!("I/O error: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_scifetch())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ScifetchError */
/* -------------------------------------------------------------------------- */

impl IntoScifetchError for HttpError {
    fn into_scifetch(self) -> ScifetchError {
        if self.is_builder() {
            return ScifetchError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if self.is_timeout() {
            return ScifetchError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return ScifetchError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                429 => ScifetchError::Network(message),
                400..=499 => ScifetchError::InvalidInput(message),
                _ => ScifetchError::Network(message),
            };
        }

        ScifetchError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_scifetch())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
