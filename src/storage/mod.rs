//! Storage layer
//!
//! SQLite-backed persistence for the two record kinds, plus the connection
//! manager that owns the store handle and its readiness state.

pub mod manager;
pub mod schema;
pub mod sqlite;

pub use manager::{RetryPolicy, StoreManager};
pub use sqlite::{SqliteStore, StoreStats};
