//! # Provault - Proforma Backup Service
//!
//! Backup ingestion and retrieval for quotation documents ("proformas")
//! and their line items.
//!
//! Provault provides:
//! - Snapshot reconciliation: full client-side backups merged into storage
//!   with idempotent, partial-failure-tolerant semantics
//! - A connection manager with bounded startup retries and background
//!   reconnection after storage outages
//! - SQLite-backed storage for the two record kinds
//! - A read-side projection combining each proforma with its items

pub mod config;
pub mod item;
pub mod proforma;
pub mod projection;
pub mod reconcile;
pub mod server;
pub mod storage;

// Re-exports for convenient access
pub use item::Item;
pub use proforma::Proforma;
pub use projection::ProjectionBuilder;
pub use reconcile::{Reconciler, Snapshot};
pub use storage::{SqliteStore, StoreManager};

/// Result type alias for Provault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Provault operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Startup connection attempts exhausted. Fatal: the service must not
    /// serve traffic without storage.
    #[error("Store connection exhausted after {attempts} attempts")]
    ConnectionExhausted { attempts: u32 },

    /// The store is currently disconnected. Non-fatal: requests fail fast
    /// while a background task reconnects.
    #[error("Store not connected")]
    StoreUnavailable,

    /// The submitted backup payload is structurally invalid (client error).
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A snapshot application failed partway. No rollback is performed;
    /// re-submitting the same snapshot self-heals.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(#[source] Box<Error>),

    /// Assembling the read-side projection failed.
    #[error("Projection failed: {0}")]
    Projection(#[source] Box<Error>),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    /// Wraps a failure from the write path.
    pub(crate) fn reconciliation(source: Error) -> Self {
        Error::Reconciliation(Box::new(source))
    }

    /// Wraps a failure from the read path.
    pub(crate) fn projection(source: Error) -> Self {
        Error::Projection(Box::new(source))
    }
}
