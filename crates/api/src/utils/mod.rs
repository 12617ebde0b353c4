//! Shared helpers for command handlers.

pub mod command_helpers;
pub mod logging;
