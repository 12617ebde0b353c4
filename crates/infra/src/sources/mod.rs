//! Override source adapters
//!
//! Every adapter implements [`ivy_core::OverrideSource`]. Remote and file
//! sources share the [`OverrideDocument`] wire shape:
//!
//! ```json
//! { "version": 7, "flags": { "dark_mode_v2": true, "home_balance_style": "compact" } }
//! ```
//!
//! Sources only fetch. Checking keys and value types against the registry is
//! the service's job, so a source never fails because of one bad entry.

pub mod env;
pub mod file;
pub mod http;
pub mod layered;
pub mod static_source;

use ivy_core::OverrideMap;
use serde::{Deserialize, Serialize};

pub use env::EnvOverrideSource;
pub use file::FileOverrideSource;
pub use http::HttpOverrideSource;
pub use layered::LayeredOverrideSource;
pub use static_source::StaticOverrideSource;

/// Override document served by the remote endpoint or stored in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideDocument {
    /// Publisher-side revision, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub flags: OverrideMap,
}
