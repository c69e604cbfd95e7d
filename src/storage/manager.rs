//! Store connection lifecycle
//!
//! Owns the single live [`SqliteStore`] handle for the process. Startup
//! connects with a bounded retry sequence; a failure there is fatal. After
//! startup, a connection-level storage error flips the manager to not-ready
//! and a background task retries the open indefinitely while requests fail
//! fast instead of queuing.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;

use super::sqlite::{SqliteStore, is_connection_error};
use crate::{Error, Result};

/// Retry behavior for connection attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts before startup gives up.
    pub max_attempts: u32,
    /// Pause between failed attempts, also the background reconnect cadence.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

enum StoreTarget {
    Path(PathBuf),
    InMemory,
}

/// Owner of the store connection and its readiness state.
///
/// Handed around as an `Arc` and injected into the reconciliation engine,
/// the projection builder, and the HTTP state, so readiness and reconnection
/// are testable without any ambient globals.
pub struct StoreManager {
    store: Mutex<Option<SqliteStore>>,
    ready: AtomicBool,
    reconnecting: AtomicBool,
    target: StoreTarget,
    retry: RetryPolicy,
    // Handle to self for the detached reconnect task.
    weak_self: Weak<StoreManager>,
}

impl StoreManager {
    /// Creates a manager for a database file. Not connected until
    /// [`connect`](Self::connect) succeeds.
    pub fn new(path: PathBuf, retry: RetryPolicy) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            store: Mutex::new(None),
            ready: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            target: StoreTarget::Path(path),
            retry,
            weak_self: weak_self.clone(),
        })
    }

    /// Creates an already-connected in-memory manager (for testing).
    pub fn in_memory() -> Result<Arc<Self>> {
        let store = SqliteStore::open_in_memory()?;
        Ok(Arc::new_cyclic(|weak_self| Self {
            store: Mutex::new(Some(store)),
            ready: AtomicBool::new(true),
            reconnecting: AtomicBool::new(false),
            target: StoreTarget::InMemory,
            retry: RetryPolicy {
                max_attempts: 1,
                interval: Duration::ZERO,
            },
            weak_self: weak_self.clone(),
        }))
    }

    /// Attempts the initial connection, up to `max_attempts` tries with
    /// `interval` between failures. Exhaustion is
    /// [`Error::ConnectionExhausted`]; the caller treats it as fatal.
    pub async fn connect(&self) -> Result<()> {
        for attempt in 1..=self.retry.max_attempts {
            match self.open_target() {
                Ok(store) => {
                    self.install(store).await;
                    tracing::info!(attempt, "store connected");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "store connection attempt failed");
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.interval).await;
                    }
                }
            }
        }

        Err(Error::ConnectionExhausted {
            attempts: self.retry.max_attempts,
        })
    }

    /// Synchronous readiness probe. Advisory: the connection can still drop
    /// mid-operation after this returns true.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Runs a closure against the live store.
    ///
    /// Fails immediately with [`Error::StoreUnavailable`] when not ready —
    /// requests are never buffered across an outage. A connection-level
    /// error from the closure drops the handle and kicks off background
    /// reconnection before the error is returned.
    pub async fn with_store<T>(&self, f: impl FnOnce(&SqliteStore) -> Result<T>) -> Result<T> {
        if !self.is_ready() {
            return Err(Error::StoreUnavailable);
        }

        let mut guard = self.store.lock().await;
        let store = guard.as_ref().ok_or(Error::StoreUnavailable)?;

        match f(store) {
            Err(e) if is_connection_error(&e) => {
                tracing::error!(error = %e, "store connection lost");
                *guard = None;
                drop(guard);
                self.handle_disconnect();
                Err(e)
            }
            result => result,
        }
    }

    /// Marks the store disconnected and spawns the reconnect loop. Post-
    /// startup disconnects are never fatal; retries repeat indefinitely.
    pub fn handle_disconnect(&self) {
        self.ready.store(false, Ordering::Release);

        // One reconnect task at a time.
        if self.reconnecting.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some(manager) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let mut attempt = 0u64;
            loop {
                tokio::time::sleep(manager.retry.interval).await;
                attempt += 1;
                match manager.open_target() {
                    Ok(store) => {
                        // Clear the flag before readiness flips back to
                        // true. Requests can only observe a connection
                        // error once `install` has run, so any disconnect
                        // they report finds the flag already cleared and
                        // spawns a fresh task instead of being swallowed.
                        manager.reconnecting.store(false, Ordering::Release);
                        manager.install(store).await;
                        tracing::info!(attempt, "store reconnected");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "store reconnect attempt failed");
                    }
                }
            }
        });
    }

    async fn install(&self, store: SqliteStore) {
        *self.store.lock().await = Some(store);
        self.ready.store(true, Ordering::Release);
    }

    fn open_target(&self) -> Result<SqliteStore> {
        match &self.target {
            StoreTarget::Path(path) => SqliteStore::open(path),
            StoreTarget::InMemory => SqliteStore::open_in_memory(),
        }
    }
}
