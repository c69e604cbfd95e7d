//! HTTP server
//!
//! Transport plumbing around the core: axum router, permissive CORS, request
//! tracing. The startup connection sequence is fatal on exhaustion; every
//! later storage outage is handled per-request by the routes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storage::{RetryPolicy, StoreManager};

pub mod routes;

/// Server state
pub struct AppState {
    pub manager: Arc<StoreManager>,
}

pub async fn start_server(port: u16, database_path: PathBuf) -> anyhow::Result<()> {
    let manager = StoreManager::new(database_path, RetryPolicy::default());
    // Startup is the only point where a connection failure is fatal.
    manager.connect().await?;

    let state = Arc::new(AppState {
        manager: Arc::clone(&manager),
    });

    let app = Router::new()
        .route("/health", get(routes::handle_health))
        .route("/backup", post(routes::handle_backup))
        .route("/proformas", get(routes::handle_proformas))
        .route("/debug/records", get(routes::handle_debug_records))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
