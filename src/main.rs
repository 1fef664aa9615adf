use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use request_metrics::config;
use request_metrics::metrics::{MetricsService, ServiceOptions, SystemClock};
use request_metrics::server;
use request_metrics::store::{MetricsStore, RedisStore};
use request_metrics::AppState;

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── 1. Config ────────────────────────────────────────────────
    let path = std::env::var("METRICS_CONFIG").unwrap_or_else(|_| "metrics.yaml".into());
    let cfg = config::load(&path).expect("config load failed");

    // ── 2. Connect to Redis (optional) ───────────────────────────
    let store: Option<Arc<dyn MetricsStore>> = match cfg.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("connecting to metrics store");
            let store = RedisStore::connect(url)
                .await
                .expect("cannot connect to Redis; is redis-server running?");
            let store: Arc<dyn MetricsStore> = Arc::new(store);
            Some(store)
        }
        None => None,
    };

    // ── 3. Build shared state ────────────────────────────────────
    let metrics = Arc::new(MetricsService::new(
        store,
        Arc::new(SystemClock),
        ServiceOptions {
            retention: cfg.retention(),
            top_endpoints: cfg.top_endpoints,
        },
    ));
    metrics.start_timer(cfg.flush_interval()).await;

    let state = Arc::new(AppState {
        metrics: Arc::clone(&metrics),
    });

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve until Ctrl-C ─────────────────────────────
    let listener = tokio::net::TcpListener::bind(&cfg.listen)
        .await
        .expect("failed to bind listen address");
    tracing::info!(listen = %cfg.listen, "request-metrics listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .expect("server exited with error");

    // ── 6. Drain the live window ─────────────────────────────────
    let outcome = metrics.stop().await;
    tracing::info!(?outcome, "metrics drained");
}
