use scifetch_domain::ScifetchError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for [`init_tracing`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global `tracing` subscriber
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), ScifetchError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    installed.map_err(|err| ScifetchError::Internal(format!("failed to install tracing: {err}")))
}
