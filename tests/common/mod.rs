#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use request_metrics::error::{MetricsError, Result};
use request_metrics::metrics::{ManualClock, MetricsService, RequestEvent, ServiceOptions};
use request_metrics::store::{MemoryStore, MetricsStore, PersistedRecord};

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

pub fn event(method: &str, url: &str, status: u16, ms: u64, caller: Option<&str>) -> RequestEvent {
    RequestEvent {
        method: method.into(),
        url: url.into(),
        status,
        response_time_ms: ms,
        caller: caller.map(str::to_owned),
        is_signup: false,
    }
}

/// Let spawned flush tasks run to completion on the test runtime.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// MemoryStore that counts upsert attempts.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    upserts: AtomicUsize,
}

impl CountingStore {
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsStore for CountingStore {
    async fn upsert(&self, record: &PersistedRecord) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(record).await
    }

    async fn range(&self, record_type: &str, from: &str, to: &str) -> Result<Vec<PersistedRecord>> {
        self.inner.range(record_type, from, to).await
    }
}

/// Store whose every call fails like an unreachable Redis.
pub struct DownStore;

fn unreachable() -> MetricsError {
    MetricsError::Store(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl MetricsStore for DownStore {
    async fn upsert(&self, _record: &PersistedRecord) -> Result<()> {
        Err(unreachable())
    }

    async fn range(&self, _: &str, _: &str, _: &str) -> Result<Vec<PersistedRecord>> {
        Err(unreachable())
    }
}

pub fn service(
    store: Option<Arc<dyn MetricsStore>>,
    clock: Arc<ManualClock>,
) -> MetricsService {
    MetricsService::new(store, clock, ServiceOptions::default())
}
