//! Request descriptors

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use url::Url;

use super::endpoint::EndpointKey;
use crate::errors::{Result, ScifetchError};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Idempotency implied by the method when the caller does not declare one
    pub fn default_idempotency(&self) -> Idempotency {
        match self {
            Self::Get | Self::Head => Idempotency::Read,
            _ => Idempotency::Mutating,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared side-effect class of a request
///
/// Only `Read` requests are eligible for the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Idempotency {
    Read,
    Mutating,
}

/// Caller-supplied deadline for the whole `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    At(Instant),
    /// Relative to the moment execution starts
    After(Duration),
}

impl Deadline {
    /// Absolute instant, given the start of execution
    pub fn resolve(&self, started: Instant) -> Instant {
        match self {
            Self::At(at) => *at,
            Self::After(budget) => started.checked_add(*budget).unwrap_or(started),
        }
    }
}

/// Everything needed to issue one logical request
///
/// Immutable once built; construct through [`RequestDescriptor::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    endpoint: EndpointKey,
    method: HttpMethod,
    url: Url,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    idempotency: Idempotency,
    deadline: Option<Deadline>,
    business_key: Option<String>,
    allow_fallback: bool,
    cost: u32,
}

impl RequestDescriptor {
    pub fn builder(endpoint: EndpointKey, method: HttpMethod, url: &str) -> RequestBuilder {
        RequestBuilder {
            endpoint,
            method,
            url: url.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            idempotency: None,
            deadline: None,
            business_key: None,
            allow_fallback: false,
            cost: 1,
        }
    }

    /// Shorthand for a `GET` with default settings
    pub fn get(endpoint: EndpointKey, url: &str) -> Result<Self> {
        Self::builder(endpoint, HttpMethod::Get, url).build()
    }

    pub fn endpoint(&self) -> &EndpointKey {
        &self.endpoint
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Base URL as given, without the descriptor's query parameters
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn idempotency(&self) -> Idempotency {
        self.idempotency
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    pub fn business_key(&self) -> Option<&str> {
        self.business_key.as_deref()
    }

    pub fn allow_fallback(&self) -> bool {
        self.allow_fallback
    }

    /// Tokens consumed from the endpoint's rate limiter per attempt
    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn is_cacheable(&self) -> bool {
        self.idempotency == Idempotency::Read
    }

    /// URL to put on the wire: the base URL plus the descriptor's parameters
    pub fn target_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }

    /// Canonical cache signature: `METHOD scheme://host/path?sorted-query`
    ///
    /// Parameters from the URL itself and from the descriptor are merged and
    /// sorted by name then value, so the order callers add them in does not
    /// matter. The fragment is dropped.
    pub fn signature(&self) -> String {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .chain(self.query.iter().cloned())
            .collect();
        pairs.sort();

        let mut canonical = self.url.clone();
        canonical.set_fragment(None);
        canonical.set_query(None);
        if !pairs.is_empty() {
            canonical.query_pairs_mut().extend_pairs(pairs.iter());
        }
        format!("{} {}", self.method, canonical)
    }
}

/// Builder for [`RequestDescriptor`]
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: EndpointKey,
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    idempotency: Option<Idempotency>,
    deadline: Option<Deadline>,
    business_key: Option<String>,
    allow_fallback: bool,
    cost: u32,
}

impl RequestBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Override the idempotency implied by the method
    pub fn idempotency(mut self, idempotency: Idempotency) -> Self {
        self.idempotency = Some(idempotency);
        self
    }

    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn timeout(self, budget: Duration) -> Self {
        self.deadline(Deadline::After(budget))
    }

    pub fn business_key(mut self, key: impl Into<String>) -> Self {
        self.business_key = Some(key.into());
        self
    }

    pub fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }

    pub fn cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn build(self) -> Result<RequestDescriptor> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScifetchError::InvalidInput(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if self.cost == 0 {
            return Err(ScifetchError::InvalidInput("request cost must be at least 1".into()));
        }

        Ok(RequestDescriptor {
            idempotency: self.idempotency.unwrap_or_else(|| self.method.default_idempotency()),
            endpoint: self.endpoint,
            method: self.method,
            url,
            headers: self.headers,
            query: self.query,
            deadline: self.deadline,
            business_key: self.business_key,
            allow_fallback: self.allow_fallback,
            cost: self.cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointKey {
        EndpointKey::new("uniprot", "rest.uniprot.org", "/uniprotkb/search")
    }

    /// Validates that the signature ignores parameter order and the
    /// fragment.
    ///
    /// Assertions:
    /// - Confirms both descriptors produce the same signature.
    /// - Confirms the exact canonical form.
    #[test]
    fn test_signature_is_order_independent() {
        let a = RequestDescriptor::builder(
            endpoint(),
            HttpMethod::Get,
            "https://rest.uniprot.org/uniprotkb/search?size=25#top",
        )
        .query("query", "P05067")
        .query("format", "json")
        .build()
        .unwrap();
        let b = RequestDescriptor::builder(
            endpoint(),
            HttpMethod::Get,
            "https://rest.uniprot.org/uniprotkb/search?format=json",
        )
        .query("size", "25")
        .query("query", "P05067")
        .build()
        .unwrap();

        assert_eq!(a.signature(), b.signature());
        assert_eq!(
            a.signature(),
            "GET https://rest.uniprot.org/uniprotkb/search?format=json&query=P05067&size=25"
        );
    }

    #[test]
    fn test_signature_distinguishes_method() {
        let get = RequestDescriptor::get(endpoint(), "https://rest.uniprot.org/x").unwrap();
        let post = RequestDescriptor::builder(endpoint(), HttpMethod::Post, "https://rest.uniprot.org/x")
            .build()
            .unwrap();
        assert_ne!(get.signature(), post.signature());
    }

    #[test]
    fn test_target_url_appends_query() {
        let req = RequestDescriptor::builder(
            endpoint(),
            HttpMethod::Get,
            "https://rest.uniprot.org/uniprotkb/search?format=json",
        )
        .query("query", "gene:APP")
        .build()
        .unwrap();
        assert_eq!(
            req.target_url().as_str(),
            "https://rest.uniprot.org/uniprotkb/search?format=json&query=gene%3AAPP"
        );
    }

    /// Validates the idempotency implied by the method and its override.
    ///
    /// Assertions:
    /// - Confirms GET defaults to `Read` and POST to `Mutating`.
    /// - Confirms a POST declared `Read` is cacheable.
    #[test]
    fn test_idempotency_defaults_and_override() {
        let get = RequestDescriptor::get(endpoint(), "https://rest.uniprot.org/x").unwrap();
        assert!(get.is_cacheable());

        let post = RequestDescriptor::builder(endpoint(), HttpMethod::Post, "https://rest.uniprot.org/x")
            .build()
            .unwrap();
        assert_eq!(post.idempotency(), Idempotency::Mutating);

        let search = RequestDescriptor::builder(endpoint(), HttpMethod::Post, "https://rest.uniprot.org/x")
            .idempotency(Idempotency::Read)
            .build()
            .unwrap();
        assert!(search.is_cacheable());
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(RequestDescriptor::get(endpoint(), "not a url").is_err());
        assert!(RequestDescriptor::get(endpoint(), "ftp://example.org/file").is_err());
        assert!(RequestDescriptor::builder(endpoint(), HttpMethod::Get, "https://example.org")
            .cost(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_deadline_resolution() {
        let start = Instant::now();
        assert_eq!(Deadline::After(Duration::from_secs(5)).resolve(start), start + Duration::from_secs(5));
        assert_eq!(Deadline::At(start).resolve(start + Duration::from_secs(1)), start);
    }
}
