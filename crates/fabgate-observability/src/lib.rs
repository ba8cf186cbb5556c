//! # fabgate-observability
//!
//! Logging setup for applications built on Fabgate.
//!
//! Library crates only emit `tracing` events; binaries call [`init_tracing`]
//! once at startup to install a subscriber. Output is human-readable text or
//! JSON lines, with levels configurable per component.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
