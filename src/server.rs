use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::telemetry;
use crate::AppState;

/// Builds the Axum `Router` with the metrics routes and telemetry layer.
///
/// Application routes are merged in by the embedding service; everything
/// behind this router is recorded.
pub fn create_router(state: Arc<AppState>) -> Router {
    create_router_with(state, Router::new())
}

pub fn create_router_with(state: Arc<AppState>, app_routes: Router<Arc<AppState>>) -> Router {
    app_routes
        // ── Health check (never counted) ────────────────────────
        .route("/api/health", get(handlers::metrics::health))
        // ── Metrics ─────────────────────────────────────────────
        .route("/api/admin/metrics", get(handlers::metrics::get_report))
        .route(
            "/api/admin/metrics/current",
            get(handlers::metrics::get_current),
        )
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            telemetry::telemetry_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
