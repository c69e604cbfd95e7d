//! Request handlers
//!
//! Every failure past startup is converted to a structured JSON body here;
//! nothing is allowed to crash the process. `/backup` and `/proformas` check
//! store readiness before any domain logic runs.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::item::Item;
use crate::proforma::Proforma;
use crate::projection::ProjectionBuilder;
use crate::reconcile::{Reconciler, Snapshot};
use crate::server::AppState;
use crate::{Error, Result};

/// `POST /backup` body. Both collections must be present; empty is valid,
/// absent is a client error.
#[derive(Deserialize)]
pub struct BackupRequest {
    #[serde(default)]
    pub data: Option<BackupData>,
}

#[derive(Deserialize)]
pub struct BackupData {
    #[serde(default)]
    pub proformas: Option<Vec<Proforma>>,
    #[serde(default)]
    pub items: Option<Vec<Item>>,
}

impl BackupRequest {
    /// Extracts a snapshot, or the reason the payload is invalid.
    fn into_snapshot(self) -> Result<Snapshot> {
        let data = self
            .data
            .ok_or_else(|| Error::InvalidSnapshot("missing data".into()))?;
        match (data.proformas, data.items) {
            (Some(proformas), Some(items)) => Ok(Snapshot { proformas, items }),
            (None, _) => Err(Error::InvalidSnapshot("missing proformas".into())),
            (_, None) => Err(Error::InvalidSnapshot("missing items".into())),
        }
    }
}

fn not_ready() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Database not connected",
        })),
    )
}

/// `GET /health` — liveness plus storage readiness, no data access.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    // Field name kept for wire compatibility with existing backup clients.
    Json(json!({
        "success": true,
        "message": "Service is running",
        "mongoConnected": state.manager.is_ready(),
    }))
}

/// `POST /backup` — reconcile one full snapshot into the store.
pub async fn handle_backup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BackupRequest>,
) -> (StatusCode, Json<Value>) {
    if !state.manager.is_ready() {
        return not_ready();
    }

    let snapshot = match request.into_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!(error = %e, "rejected backup payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Backup data is required",
                })),
            );
        }
    };

    let reconciler = Reconciler::new(Arc::clone(&state.manager));
    match reconciler.apply(&snapshot).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Backup completed successfully",
            })),
        ),
        Err(Error::StoreUnavailable) => not_ready(),
        Err(e) => {
            tracing::error!(error = %e, "backup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Backup failed",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// `GET /proformas` — the assembled projection.
pub async fn handle_proformas(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    if !state.manager.is_ready() {
        return not_ready();
    }

    let builder = ProjectionBuilder::new(Arc::clone(&state.manager));
    match builder.build().await {
        Ok(listing) => {
            let mut body = json!({
                "success": true,
                "count": listing.proformas.len(),
                "proformas": listing.proformas,
            });
            // Absent rather than null when the store holds no proformas.
            if let Some(latest) = listing.latest_modified {
                body["latestModified"] = json!(latest);
            }
            (StatusCode::OK, Json(body))
        }
        Err(Error::StoreUnavailable) => not_ready(),
        Err(e) => {
            tracing::error!(error = %e, "projection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// `GET /debug/records` — raw vs projected counts and a sample raw record.
/// Operational inspection only, not a committed contract.
pub async fn handle_debug_records(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let raw = state
        .manager
        .with_store(|store| Ok((store.stats()?, store.all_proformas()?.into_iter().next())))
        .await;

    let (stats, sample) = match raw {
        Ok(raw) => raw,
        Err(Error::StoreUnavailable) => return not_ready(),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            );
        }
    };

    let projected = match ProjectionBuilder::new(Arc::clone(&state.manager)).build().await {
        Ok(listing) => listing.proformas.len(),
        Err(_) => 0,
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "rawProformas": stats.proformas,
            "rawItems": stats.items,
            "projectedProformas": projected,
            "sample": sample,
        })),
    )
}
