//! Read side: merge persisted hourly records into a time series and summary.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::clock::{hour_key, Clock};
use crate::error::{MetricsError, Result};
use crate::store::{MetricsStore, PersistedRecord, RECORD_TYPE_HOURLY};

// ─── Period ──────────────────────────────────────────────────────

/// Lookback window of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Period {
    /// Unknown or missing labels fall back to `24h`.
    pub fn parse_or_default(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("7d") => Self::Week,
            Some("30d") => Self::Month,
            _ => Self::Day,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }

    pub fn lookback(self) -> chrono::Duration {
        match self {
            Self::Day => chrono::Duration::hours(24),
            Self::Week => chrono::Duration::days(7),
            Self::Month => chrono::Duration::days(30),
        }
    }
}

// ─── Report types ────────────────────────────────────────────────

/// One point per persisted hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub time: String,
    pub requests: u64,
    pub errors: u64,
    /// This hour's own caller count (no cross-hour dedup).
    pub unique_users: u64,
    pub avg_response_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointCount {
    pub endpoint: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_requests: u64,
    pub avg_response_ms: u64,
    /// Percent, rounded.
    pub error_rate: u64,
    pub new_signups: u64,
    /// Distinct callers across the whole period.
    pub active_users: u64,
    pub top_endpoints: Vec<EndpointCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub period: Period,
    pub time_series: Vec<TimeSeriesPoint>,
    pub summary: SummaryReport,
}

// ─── Aggregation ─────────────────────────────────────────────────

/// `round(num / den)`, or 0 when `den` is 0.
fn rounded_ratio(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    (num as f64 / den as f64).round() as u64
}

pub fn time_series(records: &[PersistedRecord]) -> Vec<TimeSeriesPoint> {
    records
        .iter()
        .map(|r| TimeSeriesPoint {
            time: r.hour_key.clone(),
            requests: r.total_requests,
            errors: r.errors(),
            unique_users: r.unique_users,
            avg_response_ms: rounded_ratio(r.total_response_time_ms, r.total_requests),
        })
        .collect()
}

/// Roll `records` up into one summary. Endpoint counts are summed across
/// hours and the `top_n` largest kept (ties by endpoint key).
pub fn summarize(records: &[PersistedRecord], top_n: usize) -> SummaryReport {
    let mut total_requests = 0u64;
    let mut total_response_ms = 0u64;
    let mut errors = 0u64;
    let mut signups = 0u64;
    let mut callers: HashSet<&str> = HashSet::new();
    let mut endpoints: HashMap<&str, u64> = HashMap::new();

    for r in records {
        total_requests += r.total_requests;
        total_response_ms = total_response_ms.saturating_add(r.total_response_time_ms);
        errors += r.errors();
        signups += r.signups;
        callers.extend(r.users.iter().map(String::as_str));
        for (endpoint, count) in &r.by_endpoint {
            *endpoints.entry(endpoint.as_str()).or_insert(0) += count;
        }
    }

    let mut ranked: Vec<EndpointCount> = endpoints
        .into_iter()
        .map(|(endpoint, count)| EndpointCount {
            endpoint: endpoint.to_owned(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.endpoint.cmp(&b.endpoint)));
    ranked.truncate(top_n);

    let error_rate = if total_requests == 0 {
        0
    } else {
        (errors as f64 / total_requests as f64 * 100.0).round() as u64
    };

    SummaryReport {
        total_requests,
        avg_response_ms: rounded_ratio(total_response_ms, total_requests),
        error_rate,
        new_signups: signups,
        active_users: callers.len() as u64,
        top_endpoints: ranked,
    }
}

// ─── Query ───────────────────────────────────────────────────────

/// Operator-facing history query. Read-only; safe to run concurrently.
pub struct AggregationQuery {
    store: Option<Arc<dyn MetricsStore>>,
    clock: Arc<dyn Clock>,
    top_n: usize,
}

impl AggregationQuery {
    pub fn new(store: Option<Arc<dyn MetricsStore>>, clock: Arc<dyn Clock>, top_n: usize) -> Self {
        Self {
            store,
            clock,
            top_n,
        }
    }

    /// Load every hourly record in `[now - period, now]` and aggregate.
    ///
    /// Unlike the write path, a missing store is an error here.
    pub async fn query(&self, period: Option<&str>) -> Result<MetricsReport> {
        let period = Period::parse_or_default(period);
        let store = self.store.as_ref().ok_or(MetricsError::StoreUnconfigured)?;

        let now = self.clock.now();
        let from = hour_key(now - period.lookback());
        let to = hour_key(now);

        let mut records = store.range(RECORD_TYPE_HOURLY, &from, &to).await?;
        records.sort_by(|a, b| a.hour_key.cmp(&b.hour_key));
        tracing::debug!(period = period.as_str(), records = records.len(), "metrics query");

        Ok(MetricsReport {
            period,
            time_series: time_series(&records),
            summary: summarize(&records, self.top_n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(hour: u32, total: u64, response_ms: u64, status: &[(&str, u64)], users: &[&str]) -> PersistedRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        PersistedRecord {
            record_type: RECORD_TYPE_HOURLY.into(),
            hour_key: hour_key(at),
            total_requests: total,
            by_endpoint: HashMap::new(),
            by_method: HashMap::new(),
            by_status: status.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            unique_users: users.len() as u64,
            users: users.iter().map(|u| u.to_string()).collect(),
            signups: 0,
            total_response_time_ms: response_ms,
            flushed_at: at,
            expires_at: at + chrono::Duration::days(90),
        }
    }

    #[test]
    fn period_labels() {
        assert_eq!(Period::parse_or_default(Some("7d")), Period::Week);
        assert_eq!(Period::parse_or_default(Some("30d")), Period::Month);
        assert_eq!(Period::parse_or_default(Some("24h")), Period::Day);
        assert_eq!(Period::parse_or_default(Some("1y")), Period::Day);
        assert_eq!(Period::parse_or_default(None), Period::Day);
        assert_eq!(serde_json::to_string(&Period::Week).unwrap(), "\"7d\"");
    }

    #[test]
    fn averages_and_error_rate_round() {
        let records = vec![
            record(1, 100, 4_000, &[("2xx", 90), ("4xx", 10)], &[]),
            record(2, 200, 9_000, &[("2xx", 180), ("5xx", 20)], &[]),
        ];
        let s = summarize(&records, 10);
        assert_eq!(s.total_requests, 300);
        assert_eq!(s.avg_response_ms, 43);
        assert_eq!(s.error_rate, 10);
    }

    #[test]
    fn active_users_are_a_set_union() {
        let records = vec![
            record(1, 2, 10, &[("2xx", 2)], &["a", "b"]),
            record(2, 2, 10, &[("2xx", 2)], &["b", "c"]),
        ];
        let s = summarize(&records, 10);
        assert_eq!(s.active_users, 3);

        let ts = time_series(&records);
        assert_eq!(ts[0].unique_users, 2);
        assert_eq!(ts[1].unique_users, 2);
    }

    #[test]
    fn time_series_point_per_record() {
        let records = vec![
            record(1, 3, 100, &[("2xx", 1), ("4xx", 1), ("5xx", 1)], &["a"]),
            record(2, 0, 0, &[], &[]),
        ];
        let ts = time_series(&records);
        assert_eq!(ts.len(), 2);
        assert_eq!(ts[0].time, "2024-01-01T01:00:00.000Z");
        assert_eq!(ts[0].errors, 2);
        assert_eq!(ts[0].avg_response_ms, 33);
        assert_eq!(ts[1].avg_response_ms, 0);
        assert_eq!(ts[1].errors, 0);
    }

    #[test]
    fn top_endpoints_merge_and_rank() {
        let mut a = record(1, 6, 0, &[], &[]);
        a.by_endpoint = [("GET /api/habits".to_string(), 4), ("GET /api/weight/latest".to_string(), 2)]
            .into_iter()
            .collect();
        let mut b = record(2, 5, 0, &[], &[]);
        b.by_endpoint = [("GET /api/weight/latest".to_string(), 3), ("POST /api/friends/request".to_string(), 2)]
            .into_iter()
            .collect();

        let s = summarize(&[a, b], 2);
        assert_eq!(
            s.top_endpoints,
            vec![
                EndpointCount { endpoint: "GET /api/weight/latest".into(), count: 5 },
                EndpointCount { endpoint: "GET /api/habits".into(), count: 4 },
            ]
        );
    }

    #[test]
    fn empty_set_is_all_zero() {
        let s = summarize(&[], 10);
        assert_eq!(s.total_requests, 0);
        assert_eq!(s.avg_response_ms, 0);
        assert_eq!(s.error_rate, 0);
        assert_eq!(s.active_users, 0);
        assert!(s.top_endpoints.is_empty());
    }
}
