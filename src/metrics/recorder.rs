use std::sync::Arc;

use super::clock::{hour_floor, hour_key, Clock};
use super::flusher::Flusher;
use super::normalize::{endpoint_key, normalize_path, HEALTH_PATH};
use super::window::SharedWindow;
use super::RequestEvent;

/// Entry point for every completed request.
pub struct RequestRecorder {
    window: Arc<SharedWindow>,
    flusher: Arc<Flusher>,
    clock: Arc<dyn Clock>,
}

impl RequestRecorder {
    pub fn new(window: Arc<SharedWindow>, flusher: Arc<Flusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            flusher,
            clock,
        }
    }

    /// Count one request. Never fails and never touches the store directly;
    /// a window retired by an hour rollover is flushed in the background.
    pub fn record(&self, event: &RequestEvent) {
        let path = normalize_path(&event.url);
        if path == HEALTH_PATH {
            return;
        }

        let hour = hour_floor(self.clock.now());
        let endpoint = endpoint_key(&event.method, &path);

        if let Some(retired) = self.window.record(hour, event, endpoint) {
            tracing::debug!(
                from = %hour_key(retired.hour),
                to = %hour_key(hour),
                requests = retired.total_requests,
                "metrics window rolled over"
            );
            self.flusher.spawn_flush(retired);
        }
    }
}
