use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::clock::{hour_key, Clock};
use super::window::{ActiveWindow, SharedWindow};
use crate::store::{MetricsStore, PersistedRecord};

/// Which path a flush took. Flushing never fails from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Written,
    /// Nothing was recorded in the window.
    SkippedEmpty,
    /// No store is configured.
    SkippedUnconfigured,
    /// The store rejected the write; logged and dropped.
    Failed,
}

// ─── Flusher ─────────────────────────────────────────────────────

/// Persists windows as hourly records (upsert, last writer wins).
pub struct Flusher {
    store: Option<Arc<dyn MetricsStore>>,
    clock: Arc<dyn Clock>,
    retention: chrono::Duration,
}

impl Flusher {
    pub fn new(
        store: Option<Arc<dyn MetricsStore>>,
        clock: Arc<dyn Clock>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub async fn flush(&self, window: &ActiveWindow) -> FlushOutcome {
        if window.is_empty() {
            return FlushOutcome::SkippedEmpty;
        }
        let Some(store) = &self.store else {
            tracing::debug!(hour = %hour_key(window.hour), "no metrics store; flush skipped");
            return FlushOutcome::SkippedUnconfigured;
        };

        let record = PersistedRecord::from_window(window, self.clock.now(), self.retention);
        match store.upsert(&record).await {
            Ok(()) => {
                tracing::debug!(
                    hour = %record.hour_key,
                    requests = record.total_requests,
                    users = record.unique_users,
                    "metrics window flushed"
                );
                FlushOutcome::Written
            }
            Err(e) => {
                tracing::warn!(
                    hour = %record.hour_key,
                    requests = record.total_requests,
                    error = %e,
                    "metrics flush failed"
                );
                FlushOutcome::Failed
            }
        }
    }

    /// Flush on the current runtime without waiting for it.
    pub fn spawn_flush(self: &Arc<Self>, window: ActiveWindow) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let flusher = Arc::clone(self);
                handle.spawn(async move {
                    flusher.flush(&window).await;
                });
            }
            Err(_) => tracing::warn!(
                hour = %hour_key(window.hour),
                requests = window.total_requests,
                "no async runtime; retired metrics window dropped"
            ),
        }
    }
}

// ─── Periodic flush ──────────────────────────────────────────────

/// Repeating flush of the live window, with a draining stop.
pub struct FlushTimer {
    window: Arc<SharedWindow>,
    flusher: Arc<Flusher>,
    handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl FlushTimer {
    pub fn new(window: Arc<SharedWindow>, flusher: Arc<Flusher>) -> Self {
        Self {
            window,
            flusher,
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// Flush a snapshot of the live window every `period`, first tick one
    /// period from now. Replaces a timer that is already running.
    pub async fn start(&self, period: Duration) {
        if period.is_zero() {
            tracing::warn!("zero flush period; metrics flush timer not started");
            return;
        }
        let window = Arc::clone(&self.window);
        let flusher = Arc::clone(&self.flusher);

        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let snapshot = window.snapshot();
                flusher.flush(&snapshot).await;
            }
        });

        let mut guard = self.handle.lock().await;
        if let Some(previous) = guard.replace(task) {
            previous.abort();
        }
        tracing::info!(period_secs = period.as_secs(), "metrics flush timer started");
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Cancel the timer (if any) and flush whatever the live window holds.
    ///
    /// Safe to call repeatedly; later calls still attempt the flush.
    pub async fn stop(&self) -> FlushOutcome {
        if let Some(task) = self.handle.lock().await.take() {
            task.abort();
            tracing::info!("metrics flush timer stopped");
        }
        let snapshot = self.window.snapshot();
        self.flusher.flush(&snapshot).await
    }
}
