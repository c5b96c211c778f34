//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::ingest::{self, IngestWindow};
use crate::domain::scan;
use crate::domain::scoring::UndervaluationScore;
use crate::domain::security::{PriceBar, Security};

use super::{ApiError, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Summary of one ingestion run, per-bar outcomes folded into tallies.
#[derive(Serialize)]
pub struct IngestResponse {
    pub symbol: String,
    pub security_id: i64,
    pub bars_upserted: usize,
    pub bars_skipped: usize,
    pub bars_failed: usize,
}

pub async fn ingest_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<IngestResponse>, ApiError> {
    let store = Arc::clone(&state.store);
    let provider = Arc::clone(&state.provider);
    let window = IngestWindow::trailing_days(today(), state.ingest_window_days);

    // The orchestrator does blocking provider and store I/O.
    let report = tokio::task::spawn_blocking(move || {
        ingest::ingest_price_history(provider.as_ref(), store.as_ref(), &symbol, window)
    })
    .await
    .map_err(|e| ApiError::internal(format!("ingestion task panicked: {e}")))??;

    tracing::info!(
        symbol = %report.symbol,
        upserted = report.upserted(),
        skipped = report.skipped(),
        failed = report.failed(),
        "price history ingested"
    );

    Ok(Json(IngestResponse {
        symbol: report.symbol.clone(),
        security_id: report.security_id,
        bars_upserted: report.upserted(),
        bars_skipped: report.skipped(),
        bars_failed: report.failed(),
    }))
}

pub async fn list_securities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Security>>, ApiError> {
    Ok(Json(state.store.list_securities()?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn price_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PriceBar>>, ApiError> {
    let security = state
        .store
        .get_security_by_symbol(symbol.trim())?
        .ok_or_else(|| ApiError::not_found(format!("unknown symbol {symbol}")))?;

    let to = query.to.unwrap_or_else(today);
    let from = query
        .from
        .unwrap_or_else(|| to - chrono::Duration::days(state.ingest_window_days));
    if from > to {
        return Err(ApiError::bad_request("from must not be after to"));
    }

    Ok(Json(state.store.get_price_bars(security.id, from, to)?))
}

pub async fn undervalued(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UndervaluationScore>>, ApiError> {
    let store = Arc::clone(&state.store);
    let weights = state.weights;
    let options = state.scan_options.clone();

    let scores = tokio::task::spawn_blocking(move || {
        scan::scan_for_undervalued(store.as_ref(), &weights, &options, today())
    })
    .await
    .map_err(|e| ApiError::internal(format!("scan task panicked: {e}")))??;

    Ok(Json(scores))
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
