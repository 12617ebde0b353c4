//! Service layer implementations.
//!
//! Services combine the ports from `ivy-core` into the runtime behaviour the
//! application consumes.

pub mod feature_flag_service;

pub use feature_flag_service::{IvyFeatures, IvyFeaturesOptions, RefreshOutcome, RefreshStatus};
