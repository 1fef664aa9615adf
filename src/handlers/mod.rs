pub mod metrics;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::MetricsError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    /// History was requested but no store is configured.
    Unconfigured,
    Store(String),
    Internal(String),
}

impl From<MetricsError> for AppError {
    fn from(e: MetricsError) -> Self {
        match e {
            MetricsError::StoreUnconfigured => Self::Unconfigured,
            MetricsError::Store(e) => Self::Store(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "metrics store is not configured".to_owned(),
            ),
            Self::Store(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Redis: {msg}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        tracing::error!(status = status.as_u16(), error = %message, "metrics request failed");

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
