//! Service configuration (strict YAML, every field defaulted).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MetricsError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Absent means "no destination": flushes are skipped, queries fail.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,

    #[serde(default = "default_retention")]
    pub retention_days: u32,

    /// Display cap for `topEndpoints`.
    #[serde(default = "default_top_endpoints")]
    pub top_endpoints: usize,
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_flush_interval() -> u64 {
    300
}
fn default_retention() -> u32 {
    90
}
fn default_top_endpoints() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            redis_url: None,
            flush_interval_secs: default_flush_interval(),
            retention_days: default_retention(),
            top_endpoints: default_top_endpoints(),
        }
    }
}

impl Config {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            return Err(MetricsError::Config(
                "flush_interval_secs must be greater than 0".into(),
            ));
        }
        if self.retention_days == 0 {
            return Err(MetricsError::Config(
                "retention_days must be greater than 0".into(),
            ));
        }
        if self.top_endpoints == 0 {
            return Err(MetricsError::Config(
                "top_endpoints must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Load config from `path`; a missing file yields defaults. `REDIS_URL`
/// overrides the file's `redis_url`.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let mut cfg = if path.exists() {
        let s = std::fs::read_to_string(path)
            .map_err(|e| MetricsError::Config(format!("read {}: {e}", path.display())))?;
        load_from_str(&s)?
    } else {
        Config::default()
    };

    if let Ok(url) = std::env::var("REDIS_URL") {
        if !url.trim().is_empty() {
            cfg.redis_url = Some(url);
        }
    }
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<Config> {
    // An empty document deserializes as unit, not as a map.
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_defaults() {
        let cfg = load_from_str("").unwrap();
        assert_eq!(cfg.flush_interval_secs, 300);
        assert_eq!(cfg.retention_days, 90);
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let cfg = load_from_str("redis_url: \"redis://127.0.0.1:6379/\"\nflush_interval_secs: 60\n")
            .unwrap();
        assert_eq!(cfg.redis_url.as_deref(), Some("redis://127.0.0.1:6379/"));
        assert_eq!(cfg.flush_interval(), Duration::from_secs(60));
        assert_eq!(cfg.top_endpoints, 10);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = load_from_str("flush_intervall_secs: 60\n").unwrap_err();
        assert!(matches!(err, MetricsError::Config(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = load_from_str("flush_interval_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("flush_interval_secs"));
    }
}
