//! Configuration loading
//!
//! A `config.toml`/`config.json` (or `ivy.*`) file supplies the base values
//! and `IVY_*` environment variables overlay them.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
