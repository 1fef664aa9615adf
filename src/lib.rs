//! In-process request metrics: hourly windows, durable flush, and
//! cross-window aggregation for the operator dashboard.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod store;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics engine — middleware records, admin routes query.
    pub metrics: Arc<metrics::MetricsService>,
}
