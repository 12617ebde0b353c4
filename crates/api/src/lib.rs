//! # Ivy App
//!
//! Application layer - commands and the `ivy-features` entry point.
//!
//! This crate contains:
//! - Feature flag commands (front end → backend bridge)
//! - Application context (dependency injection)
//! - Command timing and logging helpers
//!
//! ## Architecture
//! - Depends on `ivy-domain`, `ivy-core`, and `ivy-infra`
//! - Wires override sources, the local store and the refresh scheduler
//!   into one `IvyFeatures` service

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
