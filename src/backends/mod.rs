//! Store client implementations.
//!
//! Backends are selected with feature flags; the in-memory client is always
//! available as a store-less test double.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryClient;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteClient, SqliteConfig};
