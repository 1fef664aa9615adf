use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::RequestEvent;

// ─── Caller set ──────────────────────────────────────────────────

/// Distinct caller identities seen in one window.
///
/// Persisted twice: as a cardinality (per-hour time series) and as the full
/// membership list (cross-hour dedup at query time).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CallerSet(BTreeSet<String>);

impl CallerSet {
    pub fn insert(&mut self, caller: &str) {
        if !self.0.contains(caller) {
            self.0.insert(caller.to_owned());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, caller: &str) -> bool {
        self.0.contains(caller)
    }

    /// Members in sorted order.
    pub fn members(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

// ─── Active window ───────────────────────────────────────────────

/// Running counters for one clock hour.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveWindow {
    /// Hour-floor of the moment the window was opened. Never changes.
    pub hour: DateTime<Utc>,
    pub total_requests: u64,
    pub by_endpoint: HashMap<String, u64>,
    pub by_method: HashMap<String, u64>,
    pub by_status: HashMap<String, u64>,
    pub users: CallerSet,
    pub signups: u64,
    pub total_response_time_ms: u64,
}

impl ActiveWindow {
    pub fn new(hour: DateTime<Utc>) -> Self {
        Self {
            hour,
            total_requests: 0,
            by_endpoint: HashMap::new(),
            by_method: HashMap::new(),
            by_status: HashMap::new(),
            users: CallerSet::default(),
            signups: 0,
            total_response_time_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }

    /// Fold one completed request into the counters.
    pub fn record(&mut self, event: &RequestEvent, endpoint: String) {
        self.total_requests += 1;
        self.total_response_time_ms = self
            .total_response_time_ms
            .saturating_add(event.response_time_ms);

        *self.by_endpoint.entry(endpoint).or_insert(0) += 1;
        *self.by_method.entry(event.method.to_ascii_uppercase()).or_insert(0) += 1;
        *self.by_status.entry(status_class(event.status)).or_insert(0) += 1;

        if let Some(caller) = event.caller.as_deref() {
            self.users.insert(caller);
        }
        if event.is_signup {
            self.signups += 1;
        }
    }
}

/// `"2xx"` for 200..=299 and so on.
pub fn status_class(status: u16) -> String {
    format!("{}xx", status / 100)
}

// ─── Shared window ───────────────────────────────────────────────

/// The single live window, shared by the recorder and the flusher.
pub struct SharedWindow {
    inner: Mutex<ActiveWindow>,
}

impl SharedWindow {
    pub fn new(hour: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(ActiveWindow::new(hour)),
        }
    }

    /// Copy of the live counters; the window keeps accumulating.
    pub fn snapshot(&self) -> ActiveWindow {
        self.inner.lock().clone()
    }

    /// Record `event` into the window for `hour`.
    ///
    /// If `hour` is later than the live window's hour, the live window is
    /// swapped out for a fresh one first, under the same lock, and handed
    /// back to the caller. An earlier `hour` (a clock read that lost the race
    /// to the lock) is counted in the live window; windows only move forward.
    pub fn record(
        &self,
        hour: DateTime<Utc>,
        event: &RequestEvent,
        endpoint: String,
    ) -> Option<ActiveWindow> {
        let mut active = self.inner.lock();
        let retired = if hour > active.hour {
            Some(std::mem::replace(&mut *active, ActiveWindow::new(hour)))
        } else {
            None
        };
        active.record(event, endpoint);
        retired
    }
}
