//! Web server adapter.
//!
//! Thin JSON API over the ingestion orchestrator, the store, and the batch
//! scan. No decision logic lives here; handlers translate HTTP to port calls
//! and domain errors to statuses.

mod error;
mod handlers;

pub use error::ApiError;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::scan::ScanOptions;
use crate::domain::scoring::ScoringWeights;
use crate::ports::provider_port::ProviderPort;
use crate::ports::store_port::StorePort;

pub struct AppState {
    pub store: Arc<dyn StorePort>,
    pub provider: Arc<dyn ProviderPort>,
    pub weights: ScoringWeights,
    pub scan_options: ScanOptions,
    /// Length of the ingestion window ending today, in days.
    pub ingest_window_days: i64,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/ingest/{symbol}", post(handlers::ingest_symbol))
        .route("/api/securities", get(handlers::list_securities))
        .route(
            "/api/securities/{symbol}/history",
            get(handlers::price_history),
        )
        .route("/api/undervalued", get(handlers::undervalued))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
