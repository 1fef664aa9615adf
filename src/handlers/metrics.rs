use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::metrics::{ActiveWindow, MetricsReport};
use crate::AppState;

use super::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    /// `24h`, `7d` or `30d`; anything else means `24h`.
    pub period: Option<String>,
}

// ─── GET /api/admin/metrics ──────────────────────────────────────

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<MetricsReport>, AppError> {
    let report = state.metrics.query(params.period.as_deref()).await?;
    Ok(Json(report))
}

// ─── GET /api/admin/metrics/current ──────────────────────────────
/// The live, not yet persisted window — useful for curl / debugging.

pub async fn get_current(State(state): State<Arc<AppState>>) -> Json<ActiveWindow> {
    Json(state.metrics.snapshot())
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
