//! Database implementations

pub mod feature_overrides_repository;
pub mod manager;
pub mod memory;

pub use feature_overrides_repository::SqliteOverrideStore;
pub use manager::DbManager;
pub use memory::InMemoryOverrideStore;
