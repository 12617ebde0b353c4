//! # Ivy Core
//!
//! Pure feature-flag logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The `Features` capability interface queried by UI and business logic
//! - Port interfaces (traits) for override sources and the local store
//! - The static flag registry and snapshot resolution
//!
//! ## Architecture Principles
//! - Only depends on `ivy-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable resolution logic

pub mod features;

// Ports
pub mod feature_flags_ports;

pub use feature_flags_ports::{Features, LocalOverrideStore, OverrideMap, OverrideSource};
pub use features::registry::{keys, FeatureFlag, FeatureRegistry};
pub use features::snapshot::{
    sanitize_overrides, FlagSnapshot, FlagState, OverrideReport, RejectReason, RejectedOverride,
    ResolvedFlag,
};
