//! reqwest-backed transport

mod client;

pub use client::{HttpTransport, HttpTransportBuilder};
