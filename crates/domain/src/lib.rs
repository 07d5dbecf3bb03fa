//! # Scifetch Domain
//!
//! Plain data types for the outbound-access layer.
//!
//! This crate contains:
//! - Endpoint identity, request descriptors and attempt outcomes
//! - Fallback records and pagination state
//! - Access configuration (per-endpoint policies)
//! - The terminal error taxonomy and the general error type
//!
//! ## Architecture
//! - Depends only on `scifetch-common` and external crates
//! - No I/O and no async code

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
