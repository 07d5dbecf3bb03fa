use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Request};
use scifetch_core::{Transport, TransportError};
use scifetch_domain::{HttpMethod, Outcome, RequestDescriptor, Response, ScifetchError};
use tracing::debug;

use crate::errors::InfraError;

const DEFAULT_USER_AGENT: &str = concat!("scifetch/", env!("CARGO_PKG_VERSION"));

/// HTTP transport for the request executor.
///
/// Performs exactly one exchange per `send`; retries, admission and caching
/// belong to the executor. Every received response is returned as an
/// [`Outcome`], including error statuses.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new HTTP transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, ScifetchError> {
        Self::builder().build()
    }

    fn prepare(
        &self,
        request: &RequestDescriptor,
        timeout: Duration,
    ) -> Result<Request, TransportError> {
        let mut headers = HeaderMap::with_capacity(request.headers().len());
        for (name, value) in request.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| TransportError::new(format!("invalid header name {name:?}: {err}")))?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                TransportError::new(format!("invalid value for header {name}: {err}"))
            })?;
            headers.append(name, value);
        }

        self.client
            .request(method(request.method()), request.target_url())
            .headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::new(err.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
        timeout: Duration,
    ) -> Result<Outcome, TransportError> {
        let prepared = self.prepare(request, timeout)?;
        let method = prepared.method().clone();
        let url = prepared.url().clone();
        debug!(%method, %url, timeout_ms = timeout.as_millis() as u64, "sending HTTP request");

        let response = match self.client.execute(prepared).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                return Ok(failure_outcome(&err));
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(err) => {
                debug!(%method, %url, status, error = %err, "HTTP body read failed");
                return Ok(failure_outcome(&err));
            }
        };
        debug!(%method, %url, status, bytes = body.len(), "received HTTP response");

        Ok(Outcome::from_response(Response { status, headers, body }, Utc::now()))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(10), user_agent: None, default_headers: None }
    }
}

impl HttpTransportBuilder {
    /// Upper bound on connection establishment; the attempt timeout passed
    /// to `send` still bounds the whole exchange.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpTransport, ScifetchError> {
        let agent = self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(agent)
            .no_proxy();

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            ScifetchError::from(infra)
        })?;

        Ok(HttpTransport { client })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Outcome for an exchange that produced no usable response
fn failure_outcome(err: &reqwest::Error) -> Outcome {
    if err.is_timeout() {
        Outcome::TimeoutFailure
    } else {
        Outcome::connection_failure()
    }
}
