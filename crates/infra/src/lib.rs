//! # Scifetch Infrastructure
//!
//! Concrete adapters for the ports defined in `scifetch-core`.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - The tracing event sink and subscriber setup
//! - The configuration loader (TOML/JSON files plus environment overrides)
//! - Assembly of a ready-to-use access layer
//!
//! ## Architecture
//! - Implements traits defined in `scifetch-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod layer;
pub mod observability;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use layer::{AccessLayer, AccessLayerBuilder};
pub use observability::{init_tracing, LogFormat, TracingEventSink};
