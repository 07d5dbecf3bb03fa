//! Logging for the access layer
//!
//! [`TracingEventSink`] turns executor events into `tracing` events and
//! [`init_tracing`] installs the process-wide subscriber.

mod sink;
mod subscriber;

pub use sink::{TracingEventSink, ACCESS_TARGET};
pub use subscriber::{init_tracing, LogFormat};
