//! # Ivy Domain
//!
//! Domain types shared by every Ivy feature-flag crate.
//!
//! This crate contains:
//! - Flag value and metadata types (`FlagValue`, `FeatureGroup`, `FlagOrigin`)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Ivy crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
