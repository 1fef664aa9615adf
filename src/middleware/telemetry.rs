use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::RequestEvent;
use crate::AppState;

/// Authenticated caller of a request.
///
/// Inserted into request extensions by the auth layer, or into response
/// extensions by handlers that establish the identity (login, signup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

/// Set in response extensions by the handler that created an account.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignupMarker;

/// Path plus query string, as the recorder expects it.
fn request_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned())
}

/// Middleware that times every request and feeds the metrics recorder.
///
/// Also adds a `Server-Timing` response header.
pub async fn telemetry_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let url = request_target(req.uri());
    let request_caller = req.extensions().get::<CallerIdentity>().cloned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    let caller = response
        .extensions()
        .get::<CallerIdentity>()
        .cloned()
        .or(request_caller)
        .map(|c| c.0);
    let is_signup = response.extensions().get::<SignupMarker>().is_some();
    let status = response.status().as_u16();

    tracing::debug!(status, %method, %url, ms = elapsed.as_millis() as u64, "request");

    state.metrics.record(&RequestEvent {
        method,
        url,
        status,
        response_time_ms: elapsed.as_millis() as u64,
        caller,
        is_signup,
    });

    response
}
