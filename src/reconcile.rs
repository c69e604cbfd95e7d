//! Snapshot reconciliation engine
//!
//! The write side of the service: merges a full client-side backup into the
//! store. Three phases, strictly in order:
//!
//! 1. upsert every proforma in the snapshot,
//! 2. delete every stored item owned by any proforma in the snapshot,
//! 3. upsert every item in the snapshot.
//!
//! Phase 2 must finish before phase 3 starts; running the delete after the
//! item upserts would wipe the items just written. There is no rollback
//! across phases — each phase is individually idempotent, so a client that
//! retries the same snapshot converges on the same end state.

use std::sync::Arc;

use serde::Deserialize;

use crate::item::Item;
use crate::proforma::Proforma;
use crate::storage::StoreManager;
use crate::{Error, Result};

/// A full client-submitted backup: every proforma and item the client holds.
///
/// Proformas absent from a snapshot are left untouched; nothing is ever
/// implicitly deleted except the items of proformas being re-sent.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub proformas: Vec<Proforma>,
    pub items: Vec<Item>,
}

impl Snapshot {
    /// Ids of every proforma in this snapshot.
    fn proforma_ids(&self) -> Vec<i64> {
        self.proformas.iter().map(|p| p.id).collect()
    }
}

/// Applies snapshots to the store.
pub struct Reconciler {
    manager: Arc<StoreManager>,
}

impl Reconciler {
    pub fn new(manager: Arc<StoreManager>) -> Self {
        Self { manager }
    }

    /// Applies one snapshot.
    ///
    /// Empty collections are valid and a no-op for that kind. Items whose
    /// `proforma_id` references a proforma outside the snapshot are inserted
    /// without validation. Readiness failures pass through as
    /// [`Error::StoreUnavailable`]; everything else is wrapped in
    /// [`Error::Reconciliation`].
    pub async fn apply(&self, snapshot: &Snapshot) -> Result<()> {
        let parent_ids = snapshot.proforma_ids();

        let result = self
            .manager
            .with_store(|store| {
                for proforma in &snapshot.proformas {
                    store.upsert_proforma(proforma)?;
                }

                // Clear stored items for every re-sent proforma before any
                // replacement item lands, including proformas the snapshot
                // supplies no items for.
                let deleted = store.delete_items_for_proformas(&parent_ids)?;

                for item in &snapshot.items {
                    store.upsert_item(item)?;
                }

                Ok(deleted)
            })
            .await;

        match result {
            Ok(deleted) => {
                tracing::info!(
                    proformas = snapshot.proformas.len(),
                    items = snapshot.items.len(),
                    deleted_items = deleted,
                    "snapshot reconciled"
                );
                Ok(())
            }
            Err(Error::StoreUnavailable) => Err(Error::StoreUnavailable),
            Err(e) => Err(Error::reconciliation(e)),
        }
    }
}
