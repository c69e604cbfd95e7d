//! Parent record: a quotation document

use serde::{Deserialize, Serialize};

/// A proforma quotation document.
///
/// The `id` is assigned by the client and must be unique across the whole
/// store. Timestamps are opaque strings supplied by the client; the service
/// never parses them as calendar dates, only compares them lexically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proforma {
    pub id: i64,
    pub proforma_number: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub vehicle_make: Option<String>,
    #[serde(default)]
    pub vehicle_model: Option<String>,
    #[serde(default)]
    pub plate_number: Option<String>,
    #[serde(default)]
    pub chassis_number: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub date_created: String,
    pub last_modified: String,
    #[serde(default)]
    pub prepared_by: Option<String>,
    #[serde(default)]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}
