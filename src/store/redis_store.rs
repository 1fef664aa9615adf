use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{MetricsStore, PersistedRecord};
use crate::error::{MetricsError, Result};

/// Redis-backed store.
///
/// Each record is a JSON string under `metrics:<type>:<hourKey>` with a TTL
/// matching its `expiresAt`. A per-type sorted set (all scores 0) indexes the
/// hour keys so range reads are a `ZRANGEBYLEX` followed by one `MGET`.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Open a `ConnectionManager` (auto-reconnects; cheap to clone).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

fn record_key(record_type: &str, hour_key: &str) -> String {
    format!("metrics:{record_type}:{hour_key}")
}

fn index_key(record_type: &str) -> String {
    format!("metrics:{record_type}:index")
}

/// Decode the `MGET` reply for `hour_keys`.
///
/// Returns the records in index order plus the hour keys whose value was
/// gone (TTL elapsed; the index entry outlived its record).
fn decode_range(
    record_type: &str,
    hour_keys: &[String],
    values: Vec<Option<String>>,
) -> Result<(Vec<PersistedRecord>, Vec<String>)> {
    let mut records = Vec::with_capacity(values.len());
    let mut expired = Vec::new();
    for (hour_key, value) in hour_keys.iter().zip(values) {
        match value {
            Some(json) => {
                let record = serde_json::from_str(&json).map_err(|source| {
                    MetricsError::MalformedRecord {
                        key: record_key(record_type, hour_key),
                        source,
                    }
                })?;
                records.push(record);
            }
            None => expired.push(hour_key.clone()),
        }
    }
    Ok((records, expired))
}

#[async_trait]
impl MetricsStore for RedisStore {
    async fn upsert(&self, record: &PersistedRecord) -> Result<()> {
        let key = record_key(&record.record_type, &record.hour_key);
        let json = serde_json::to_string(record)?;
        let ttl_secs = (record.expires_at - record.flushed_at).num_seconds().max(1);

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&key)
            .arg(&json)
            .arg("EX")
            .arg(ttl_secs)
            .ignore()
            .cmd("ZADD")
            .arg(index_key(&record.record_type))
            .arg(0)
            .arg(&record.hour_key)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn range(
        &self,
        record_type: &str,
        from_key: &str,
        to_key: &str,
    ) -> Result<Vec<PersistedRecord>> {
        if from_key > to_key {
            return Ok(Vec::new());
        }
        let index = index_key(record_type);
        let mut conn = self.conn.clone();

        let hour_keys: Vec<String> = redis::cmd("ZRANGEBYLEX")
            .arg(&index)
            .arg(format!("[{from_key}"))
            .arg(format!("[{to_key}"))
            .query_async(&mut conn)
            .await?;
        if hour_keys.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = hour_keys
            .iter()
            .map(|h| record_key(record_type, h))
            .collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let (records, expired) = decode_range(record_type, &hour_keys, values)?;

        if !expired.is_empty() {
            let trimmed: redis::RedisResult<()> = redis::cmd("ZREM")
                .arg(&index)
                .arg(&expired)
                .query_async(&mut conn)
                .await;
            if let Err(e) = trimmed {
                tracing::warn!(error = %e, stale = expired.len(), "failed to trim metrics index");
            }
        }

        Ok(records)
    }
}
