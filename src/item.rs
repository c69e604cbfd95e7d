//! Child record: a proforma line item

use serde::{Deserialize, Serialize};

/// A single line item belonging to one proforma.
///
/// `id` is client-assigned and globally unique among items. `proforma_id`
/// references the owning proforma; the reconciliation engine inserts items
/// without validating that the referenced parent exists (see the open
/// question recorded in DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub proforma_id: i64,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub last_modified: String,
}
