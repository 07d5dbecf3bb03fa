//! Test doubles for the access ports
//!
//! Available with the `test-utils` feature so adapter crates can drive the
//! executor without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use scifetch_domain::{Outcome, RequestDescriptor, Response};

use crate::access::events::AccessEvent;
use crate::access::ports::{AccessEventSink, Transport, TransportError};

#[derive(Debug, Clone)]
enum Step {
    Reply(Outcome),
    Delayed(Duration, Outcome),
    Refuse(String),
}

/// Transport that replays scripted outcomes per target URL
///
/// URLs are matched against [`RequestDescriptor::target_url`] in its
/// normalized string form. Once a URL's script runs dry every further call
/// gets the exhausted outcome, a connection failure unless overridden.
#[derive(Debug)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    when_exhausted: Mutex<Outcome>,
    calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            when_exhausted: Mutex::new(Outcome::connection_failure()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a raw outcome for `url`
    pub fn push(&self, url: &str, outcome: Outcome) {
        self.enqueue(url, Step::Reply(outcome));
    }

    /// Queue a response, classified the way a real transport would
    pub fn respond(&self, url: &str, response: Response) {
        self.push(url, Outcome::from_response(response, Utc::now()));
    }

    /// Queue `count` responses with the same status and an empty body
    pub fn respond_status(&self, url: &str, status: u16, count: usize) {
        for _ in 0..count {
            self.respond(url, Response::new(status, Vec::new()));
        }
    }

    /// Queue an outcome delivered only after `delay`
    pub fn push_delayed(&self, url: &str, delay: Duration, outcome: Outcome) {
        self.enqueue(url, Step::Delayed(delay, outcome));
    }

    /// Queue a refusal to issue the request
    pub fn refuse(&self, url: &str, message: &str) {
        self.enqueue(url, Step::Refuse(message.to_string()));
    }

    pub fn when_exhausted(&self, outcome: Outcome) {
        *self.when_exhausted.lock() = outcome;
    }

    /// Total calls to `send`
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|seen| seen.as_str() == url).count()
    }

    /// Target URLs in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn enqueue(&self, url: &str, step: Step) {
        self.scripts.lock().entry(url.to_string()).or_default().push_back(step);
    }

    fn next_step(&self, url: &str) -> Step {
        self.scripts
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Step::Reply(self.when_exhausted.lock().clone()))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &RequestDescriptor,
        _timeout: Duration,
    ) -> Result<Outcome, TransportError> {
        let url = request.target_url().to_string();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(url.clone());

        match self.next_step(&url) {
            Step::Reply(outcome) => Ok(outcome),
            Step::Delayed(delay, outcome) => {
                tokio::time::sleep(delay).await;
                Ok(outcome)
            }
            Step::Refuse(message) => Err(TransportError::new(message)),
        }
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<AccessEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AccessEvent> {
        self.events.lock().clone()
    }

    /// Events that record a network attempt
    pub fn attempt_events(&self) -> Vec<AccessEvent> {
        self.events.lock().iter().filter(|event| event.kind.is_attempt()).cloned().collect()
    }

    /// Number of events named `name`
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|event| event.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AccessEventSink for RecordingEventSink {
    fn emit(&self, event: &AccessEvent) {
        self.events.lock().push(event.clone());
    }
}
