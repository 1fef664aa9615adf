//! Persistence boundary for completed hourly windows.

pub mod memory;
pub mod redis_store;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::clock::hour_key;
use crate::metrics::window::ActiveWindow;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Record type of the per-hour rollups.
pub const RECORD_TYPE_HOURLY: &str = "hourly";

/// Upsert-by-key document store.
///
/// Records are identified by `(record_type, hour_key)`; a second upsert
/// with the same identity overwrites the first.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn upsert(&self, record: &PersistedRecord) -> Result<()>;

    /// Records of `record_type` whose hour key lies in `[from_key, to_key]`,
    /// ascending by hour key.
    async fn range(
        &self,
        record_type: &str,
        from_key: &str,
        to_key: &str,
    ) -> Result<Vec<PersistedRecord>>;
}

/// Snapshot of one hour as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub record_type: String,
    pub hour_key: String,
    pub total_requests: u64,
    #[serde(default)]
    pub by_endpoint: HashMap<String, u64>,
    #[serde(default)]
    pub by_method: HashMap<String, u64>,
    #[serde(default)]
    pub by_status: HashMap<String, u64>,
    #[serde(default)]
    pub unique_users: u64,
    /// Literal caller identities, kept for dedup across hours.
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub signups: u64,
    #[serde(default)]
    pub total_response_time_ms: u64,
    pub flushed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn from_window(
        window: &ActiveWindow,
        flushed_at: DateTime<Utc>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            record_type: RECORD_TYPE_HOURLY.to_owned(),
            hour_key: hour_key(window.hour),
            total_requests: window.total_requests,
            by_endpoint: window.by_endpoint.clone(),
            by_method: window.by_method.clone(),
            by_status: window.by_status.clone(),
            unique_users: window.users.len() as u64,
            users: window.users.members(),
            signups: window.signups,
            total_response_time_ms: window.total_response_time_ms,
            flushed_at,
            expires_at: flushed_at + retention,
        }
    }

    /// 4xx + 5xx; a missing class counts as zero.
    pub fn errors(&self) -> u64 {
        ["4xx", "5xx"]
            .iter()
            .map(|class| self.by_status.get(*class).copied().unwrap_or(0))
            .sum()
    }
}
