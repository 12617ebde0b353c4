//! Observability infrastructure
//!
//! Structured logging is provided by `tracing`. Every crate emits events with
//! structured fields; this module installs the global subscriber that renders
//! them, either as human-readable lines or as JSON objects.

pub mod logging;

pub use logging::{build_env_filter, init};
