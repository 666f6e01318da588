//! Axum control server
//!
//! Thin read-only surface over the running engine: current balance
//! and open-position count, plus an on-demand snapshot export. Runs
//! alongside the scheduler and never pauses ticking; it only takes
//! read locks on the ledger.

use crate::ledger::Ledger;
use crate::sink::LedgerSink;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub sink: Arc<dyn LedgerSink>,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub balance: Decimal,
    pub positions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create the Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/status", get(get_status))
        .route("/snapshot", get(export_snapshot))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Current balance and open-position count
async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let ledger = state.ledger.read().await;

    Json(StatusResponse {
        balance: ledger.balance,
        positions: ledger.open_count(),
    })
}

/// Export a point-in-time snapshot of closed positions
async fn export_snapshot(
    State(state): State<AppState>,
) -> Result<&'static str, (StatusCode, Json<ErrorResponse>)> {
    let ledger = state.ledger.read().await;

    state.sink.export_snapshot(ledger.positions()).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Snapshot export failed: {}", e),
            }),
        )
    })?;

    Ok("Snapshot exported")
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
