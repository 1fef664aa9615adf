use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{MetricsStore, PersistedRecord};
use crate::error::Result;

/// Process-local store. Backs tests and runs without Redis.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(String, String), PersistedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn get(&self, record_type: &str, hour_key: &str) -> Option<PersistedRecord> {
        self.records
            .lock()
            .get(&(record_type.to_owned(), hour_key.to_owned()))
            .cloned()
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn upsert(&self, record: &PersistedRecord) -> Result<()> {
        let key = (record.record_type.clone(), record.hour_key.clone());
        self.records.lock().insert(key, record.clone());
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
        let from = (record_type.to_owned(), from_key.to_owned());
        let to = (record_type.to_owned(), to_key.to_owned());
        Ok(self
            .records
            .lock()
            .range(from..=to)
            .map(|(_, rec)| rec.clone())
            .collect())
    }
}
