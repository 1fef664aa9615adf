pub mod aggregate;
pub mod clock;
pub mod flusher;
pub mod normalize;
pub mod recorder;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::store::MetricsStore;

pub use aggregate::{AggregationQuery, MetricsReport, Period, SummaryReport, TimeSeriesPoint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use flusher::{FlushOutcome, FlushTimer, Flusher};
pub use recorder::RequestRecorder;
pub use window::{ActiveWindow, CallerSet, SharedWindow};

/// One completed HTTP call, as reported by the middleware.
/// This is the "write" side — the middleware builds these and pushes them in.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub method: String,
    /// Raw request target, query string included.
    pub url: String,
    pub status: u16,
    pub response_time_ms: u64,
    /// Authenticated caller, if any.
    pub caller: Option<String>,
    /// Taken as given; never inferred from the route.
    pub is_signup: bool,
}

/// Settings the service needs beyond its collaborators.
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    pub retention: chrono::Duration,
    pub top_endpoints: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            retention: chrono::Duration::days(90),
            top_endpoints: 10,
        }
    }
}

/// Owns the live window and everything that reads or writes it.
pub struct MetricsService {
    window: Arc<SharedWindow>,
    recorder: RequestRecorder,
    timer: FlushTimer,
    query: AggregationQuery,
}

impl MetricsService {
    pub fn new(
        store: Option<Arc<dyn MetricsStore>>,
        clock: Arc<dyn Clock>,
        options: ServiceOptions,
    ) -> Self {
        let window = Arc::new(SharedWindow::new(clock::hour_floor(clock.now())));
        let flusher = Arc::new(Flusher::new(
            store.clone(),
            Arc::clone(&clock),
            options.retention,
        ));

        if !flusher.is_configured() {
            tracing::warn!("no metrics store configured; hourly windows will not be persisted");
        }

        Self {
            recorder: RequestRecorder::new(
                Arc::clone(&window),
                Arc::clone(&flusher),
                Arc::clone(&clock),
            ),
            timer: FlushTimer::new(Arc::clone(&window), flusher),
            query: AggregationQuery::new(store, clock, options.top_endpoints),
            window,
        }
    }

    /// Record a single completed request. Called from the middleware.
    pub fn record(&self, event: &RequestEvent) {
        self.recorder.record(event);
    }

    /// Copy of the live window for the dashboard.
    pub fn snapshot(&self) -> ActiveWindow {
        self.window.snapshot()
    }

    pub async fn start_timer(&self, period: Duration) {
        self.timer.start(period).await;
    }

    pub async fn timer_running(&self) -> bool {
        self.timer.is_running().await
    }

    /// Stop the periodic flush and drain the live window.
    pub async fn stop(&self) -> FlushOutcome {
        self.timer.stop().await
    }

    pub async fn query(&self, period: Option<&str>) -> Result<MetricsReport> {
        self.query.query(period).await
    }
}
