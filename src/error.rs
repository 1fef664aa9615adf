//! Error type shared by the store, the query path and config loading.
//!
//! The recording and flushing paths never return these to callers; they
//! log and move on. Only the read path and boot surface them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// No persistence destination was configured.
    #[error("metrics store is not configured")]
    StoreUnconfigured,

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("encode error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A persisted record could not be decoded.
    #[error("malformed record {key}: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("config: {0}")]
    Config(String),
}
