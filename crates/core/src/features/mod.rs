//! Flag registry and snapshot resolution

pub mod registry;
pub mod snapshot;
