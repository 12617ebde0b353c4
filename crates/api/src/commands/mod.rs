//! Commands - front end to backend bridge

mod feature_flags;

pub use feature_flags::*;
