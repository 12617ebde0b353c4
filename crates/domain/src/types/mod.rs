//! Domain types and models

pub mod feature;

pub use feature::{FeatureGroup, FlagKind, FlagOrigin, FlagValue};
