//! Access layer assembly
//!
//! Wires a configuration, the HTTP transport and the tracing sink into a
//! shared [`RequestExecutor`].

use std::path::PathBuf;
use std::sync::Arc;

use scifetch_core::{AccessEventSink, Fetched, RequestExecutor, Transport};
use scifetch_domain::{AccessConfig, AccessError, RequestDescriptor, Result};

use crate::config;
use crate::http::HttpTransport;
use crate::observability::TracingEventSink;

/// A ready-to-use executor plus the configuration it was built from
#[derive(Clone)]
pub struct AccessLayer {
    executor: Arc<RequestExecutor>,
}

impl AccessLayer {
    pub fn builder(config: AccessConfig) -> AccessLayerBuilder {
        AccessLayerBuilder { config, transport: None, sink: None }
    }

    /// Load configuration (see [`config::load`]) and assemble the defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        Self::builder(config::load(path)?).build()
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    pub fn config(&self) -> &AccessConfig {
        self.executor.registry().config()
    }

    pub async fn execute(
        &self,
        request: &RequestDescriptor,
    ) -> std::result::Result<Fetched, AccessError> {
        self.executor.execute(request).await
    }
}

/// Builder for [`AccessLayer`]
///
/// Without overrides the transport is a default [`HttpTransport`] and events
/// go to [`TracingEventSink`].
pub struct AccessLayerBuilder {
    config: AccessConfig,
    transport: Option<Arc<dyn Transport>>,
    sink: Option<Arc<dyn AccessEventSink>>,
}

impl AccessLayerBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn AccessEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<AccessLayer> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingEventSink::new()));

        let executor = RequestExecutor::new(self.config, transport, sink)?;
        tracing::info!(sources = executor.registry().config().sources.len(), "access layer ready");
        Ok(AccessLayer { executor: Arc::new(executor) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scifetch_core::testing::{RecordingEventSink, ScriptedTransport};
    use scifetch_domain::{EndpointKey, EndpointPolicy, Response, ScifetchError};

    use super::*;

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut policy = EndpointPolicy::default();
        policy.retry.max_attempts = 0;
        let config = AccessConfig::default().with_source("chembl", policy);

        let err = AccessLayer::builder(config).build().err().expect("invalid config");
        assert!(matches!(err, ScifetchError::Common(_)));
    }

    /// Validates that a built layer routes through the injected ports.
    ///
    /// Assertions:
    /// - Confirms the scripted response is returned.
    /// - Confirms events reach the injected sink.
    #[tokio::test(start_paused = true)]
    async fn test_executes_through_injected_ports() {
        let url = "https://www.ebi.ac.uk/chembl/api/data/molecule/CHEMBL25";
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(url, Response::new(200, r#"{"id":"CHEMBL25"}"#));
        let sink = Arc::new(RecordingEventSink::new());

        let mut policy = EndpointPolicy::default();
        policy.rate_limit.jitter_max = Duration::ZERO;
        let layer = AccessLayer::builder(AccessConfig::default().with_source("chembl", policy))
            .transport(transport.clone())
            .sink(sink.clone())
            .build()
            .expect("layer");

        let key = EndpointKey::new("chembl", "www.ebi.ac.uk", "/chembl/api/data/molecule");
        let request = RequestDescriptor::get(key, url).expect("request");
        let fetched = layer.execute(&request).await.expect("fetched");

        assert_eq!(fetched.response().map(|r| r.status), Some(200));
        assert_eq!(transport.calls(), 1);
        assert_eq!(sink.count("completed"), 1);
        assert!(layer.config().sources.contains_key("chembl"));
    }
}
