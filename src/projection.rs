//! Read-side projection
//!
//! Assembles the externally visible shape of each proforma together with its
//! items. Internal identifiers stay internal: the emitted proforma carries no
//! `id`, the emitted item neither `id` nor `proformaId`.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::item::Item;
use crate::proforma::Proforma;
use crate::storage::StoreManager;
use crate::{Error, Result};

/// Externally visible proforma: business fields plus its items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProformaView {
    pub proforma_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub plate_number: Option<String>,
    pub chassis_number: Option<String>,
    pub vehicle_type: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub date_created: String,
    pub last_modified: String,
    pub prepared_by: Option<String>,
    pub valid_until: Option<String>,
    pub user_id: Option<String>,
    pub items: Vec<ItemView>,
}

/// Externally visible line item, stripped of internal identifiers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub name: String,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub last_modified: String,
}

/// The assembled read-endpoint payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub proformas: Vec<ProformaView>,
    /// `lastModified` of the most recent proforma; `None` when empty.
    pub latest_modified: Option<String>,
}

/// Builds the parent+children projection from the store.
pub struct ProjectionBuilder {
    manager: Arc<StoreManager>,
}

impl ProjectionBuilder {
    pub fn new(manager: Arc<StoreManager>) -> Self {
        Self { manager }
    }

    /// Loads every proforma with its items.
    ///
    /// Proformas are sorted most-recent first by lexical comparison of the
    /// client-supplied timestamp strings (`dateCreated`, then
    /// `lastModified`); the sort is stable, so ties keep storage order.
    /// Items keep their storage retrieval order and are never re-sorted.
    pub async fn build(&self) -> Result<Listing> {
        let result = self
            .manager
            .with_store(|store| {
                let mut proformas = store.all_proformas()?;
                proformas.sort_by(compare_recency);

                let ids: Vec<i64> = proformas.iter().map(|p| p.id).collect();
                let mut items = store.items_for_proformas(&ids)?;

                let views = proformas
                    .iter()
                    .map(|p| {
                        let (mine, rest): (Vec<Item>, Vec<Item>) = std::mem::take(&mut items)
                            .into_iter()
                            .partition(|i| i.proforma_id == p.id);
                        items = rest;
                        to_view(p, mine)
                    })
                    .collect();

                let latest_modified = proformas.first().map(|p| p.last_modified.clone());

                Ok(Listing {
                    proformas: views,
                    latest_modified,
                })
            })
            .await;

        match result {
            Ok(listing) => Ok(listing),
            Err(Error::StoreUnavailable) => Err(Error::StoreUnavailable),
            Err(e) => Err(Error::projection(e)),
        }
    }
}

/// Most recent first: `dateCreated` descending, then `lastModified`
/// descending. Plain string comparison, never date parsing.
fn compare_recency(a: &Proforma, b: &Proforma) -> Ordering {
    b.date_created
        .cmp(&a.date_created)
        .then_with(|| b.last_modified.cmp(&a.last_modified))
}

fn to_view(proforma: &Proforma, items: Vec<Item>) -> ProformaView {
    ProformaView {
        proforma_number: proforma.proforma_number.clone(),
        customer_name: proforma.customer_name.clone(),
        customer_phone: proforma.customer_phone.clone(),
        vehicle_make: proforma.vehicle_make.clone(),
        vehicle_model: proforma.vehicle_model.clone(),
        plate_number: proforma.plate_number.clone(),
        chassis_number: proforma.chassis_number.clone(),
        vehicle_type: proforma.vehicle_type.clone(),
        subtotal: proforma.subtotal,
        tax: proforma.tax,
        total: proforma.total,
        date_created: proforma.date_created.clone(),
        last_modified: proforma.last_modified.clone(),
        prepared_by: proforma.prepared_by.clone(),
        valid_until: proforma.valid_until.clone(),
        user_id: proforma.user_id.clone(),
        items: items
            .into_iter()
            .map(|i| ItemView {
                name: i.name,
                unit: i.unit,
                quantity: i.quantity,
                unit_price: i.unit_price,
                total_price: i.total_price,
                last_modified: i.last_modified,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Reconciler, Snapshot};

    fn proforma(id: i64, created: &str, modified: &str) -> Proforma {
        Proforma {
            id,
            proforma_number: format!("PF-{id:03}"),
            customer_name: "Asha Garage".into(),
            customer_phone: None,
            vehicle_make: None,
            vehicle_model: None,
            plate_number: None,
            chassis_number: None,
            vehicle_type: None,
            subtotal: 100.0,
            tax: 18.0,
            total: 118.0,
            date_created: created.into(),
            last_modified: modified.into(),
            prepared_by: None,
            valid_until: None,
            user_id: None,
        }
    }

    fn item(id: i64, proforma_id: i64, name: &str) -> Item {
        Item {
            id,
            proforma_id,
            name: name.into(),
            unit: None,
            quantity: 1.0,
            unit_price: 10.0,
            total_price: 10.0,
            last_modified: "2024-01-01".into(),
        }
    }

    async fn seeded_manager(proformas: Vec<Proforma>, items: Vec<Item>) -> Arc<StoreManager> {
        let manager = StoreManager::in_memory().unwrap();
        Reconciler::new(Arc::clone(&manager))
            .apply(&Snapshot { proformas, items })
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn most_recent_proforma_first() {
        let manager = seeded_manager(
            vec![
                proforma(1, "2024-01-01", "2024-01-01"),
                proforma(2, "2024-01-02", "2024-01-02"),
            ],
            vec![item(1, 2, "Brake pads"), item(2, 1, "Oil filter")],
        )
        .await;

        let listing = ProjectionBuilder::new(manager).build().await.unwrap();

        assert_eq!(listing.proformas.len(), 2);
        assert_eq!(listing.proformas[0].date_created, "2024-01-02");
        assert_eq!(listing.proformas[0].items.len(), 1);
        assert_eq!(listing.proformas[0].items[0].name, "Brake pads");
        assert_eq!(listing.latest_modified.as_deref(), Some("2024-01-02"));
    }

    #[tokio::test]
    async fn same_day_ties_break_on_last_modified() {
        let manager = seeded_manager(
            vec![
                proforma(1, "2024-01-01", "2024-01-01T08:00:00"),
                proforma(2, "2024-01-01", "2024-01-01T17:00:00"),
            ],
            vec![],
        )
        .await;

        let listing = ProjectionBuilder::new(manager).build().await.unwrap();
        assert_eq!(listing.proformas[0].proforma_number, "PF-002");
    }

    #[tokio::test]
    async fn internal_ids_are_stripped() {
        let manager = seeded_manager(
            vec![proforma(1, "2024-01-01", "2024-01-01")],
            vec![item(1, 1, "Brake pads")],
        )
        .await;

        let listing = ProjectionBuilder::new(manager).build().await.unwrap();
        let json = serde_json::to_value(&listing.proformas).unwrap();

        let parent = &json[0];
        assert!(parent.get("id").is_none());
        assert!(parent.get("proformaNumber").is_some());
        let child = &parent["items"][0];
        assert!(child.get("id").is_none());
        assert!(child.get("proformaId").is_none());
        assert_eq!(child["name"], "Brake pads");
    }

    #[tokio::test]
    async fn listing_serializes_camel_case() {
        let manager = seeded_manager(
            vec![proforma(1, "2024-01-01", "2024-01-01")],
            vec![],
        )
        .await;

        let listing = ProjectionBuilder::new(manager).build().await.unwrap();
        let json = serde_json::to_value(&listing).unwrap();

        assert_eq!(json["latestModified"], "2024-01-01");
        assert!(json.get("latest_modified").is_none());
    }

    #[tokio::test]
    async fn empty_store_has_no_freshness_marker() {
        let manager = StoreManager::in_memory().unwrap();

        let listing = ProjectionBuilder::new(manager).build().await.unwrap();
        assert!(listing.proformas.is_empty());
        assert!(listing.latest_modified.is_none());
    }

    #[tokio::test]
    async fn items_keep_storage_order() {
        let manager = seeded_manager(
            vec![proforma(1, "2024-01-01", "2024-01-01")],
            vec![
                item(5, 1, "Coolant"),
                item(2, 1, "Brake pads"),
                item(9, 1, "Oil filter"),
            ],
        )
        .await;

        let listing = ProjectionBuilder::new(manager).build().await.unwrap();
        let names: Vec<_> = listing.proformas[0]
            .items
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        // Storage order for client-assigned ids is id order.
        assert_eq!(names, vec!["Brake pads", "Coolant", "Oil filter"]);
    }
}
