//! Month fetch diagnostics
//!
//! Instance-owned rollup of fetch outcomes per kind: how often the planner
//! degraded or failed, when the last fetch ran and how long it took.
//! Serialized as-is for an operator panel; nothing here feeds back into
//! planning decisions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::planner::MonthFetch;
use crate::types::ActivityKind;

#[derive(Debug, Clone, Default)]
struct Counters {
    attempts: u64,
    degraded: u64,
    failures: u64,
    last_fetch_at: Option<DateTime<Utc>>,
    last_duration_ms: Option<u64>,
    last_error: Option<String>,
}

/// One kind's counters as reported outward.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindFetchStats {
    pub kind: ActivityKind,
    pub attempts: u64,
    pub degraded: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Accumulates fetch outcomes for one engine instance.
#[derive(Default)]
pub struct FetchStatsRecorder {
    inner: Mutex<HashMap<ActivityKind, Counters>>,
}

impl FetchStatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, fetch: &MonthFetch, duration_ms: u64) {
        let mut inner = self.inner.lock();
        let counters = inner.entry(fetch.kind).or_default();
        counters.attempts += 1;
        if fetch.strategy.is_degraded() {
            counters.degraded += 1;
        }
        if fetch.error.is_some() {
            counters.failures += 1;
        }
        counters.last_fetch_at = Some(Utc::now());
        counters.last_duration_ms = Some(duration_ms);
        // A clean fetch clears the sticky error from a failed one.
        counters.last_error = fetch.error.clone();
    }

    /// All three kinds in fixed order, zeroed rows included, so the
    /// operator panel has a stable shape.
    pub fn snapshot(&self) -> Vec<KindFetchStats> {
        let inner = self.inner.lock();
        ActivityKind::ALL
            .iter()
            .map(|&kind| {
                let counters = inner.get(&kind).cloned().unwrap_or_default();
                KindFetchStats {
                    kind,
                    attempts: counters.attempts,
                    degraded: counters.degraded,
                    failures: counters.failures,
                    last_fetch_at: counters.last_fetch_at,
                    last_duration_ms: counters.last_duration_ms,
                    last_error: counters.last_error,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::FetchStrategy;

    fn make_fetch(kind: ActivityKind, strategy: FetchStrategy, error: Option<&str>) -> MonthFetch {
        MonthFetch {
            kind,
            records: Vec::new(),
            strategy,
            advisory: None,
            error: error.map(|e| e.to_string()),
        }
    }

    #[test]
    fn test_counters_accumulate() {
        let recorder = FetchStatsRecorder::new();
        recorder.record(
            &make_fetch(ActivityKind::Task, FetchStrategy::Indexed, None),
            12,
        );
        recorder.record(
            &make_fetch(ActivityKind::Task, FetchStrategy::ScanFallback, None),
            80,
        );
        recorder.record(
            &make_fetch(ActivityKind::Task, FetchStrategy::Indexed, Some("offline")),
            5,
        );

        let stats = recorder.snapshot();
        let task_row = stats
            .iter()
            .find(|s| s.kind == ActivityKind::Task)
            .unwrap();
        assert_eq!(task_row.attempts, 3);
        assert_eq!(task_row.degraded, 1);
        assert_eq!(task_row.failures, 1);
        assert_eq!(task_row.last_duration_ms, Some(5));
        assert_eq!(task_row.last_error.as_deref(), Some("offline"));
    }

    #[test]
    fn test_clean_fetch_clears_last_error() {
        let recorder = FetchStatsRecorder::new();
        recorder.record(
            &make_fetch(ActivityKind::Event, FetchStrategy::Indexed, Some("offline")),
            5,
        );
        recorder.record(
            &make_fetch(ActivityKind::Event, FetchStrategy::Indexed, None),
            9,
        );

        let stats = recorder.snapshot();
        let event_row = stats
            .iter()
            .find(|s| s.kind == ActivityKind::Event)
            .unwrap();
        assert_eq!(event_row.failures, 1);
        assert!(event_row.last_error.is_none());
    }

    #[test]
    fn test_snapshot_has_stable_shape() {
        let recorder = FetchStatsRecorder::new();
        let stats = recorder.snapshot();
        let kinds: Vec<ActivityKind> = stats.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, ActivityKind::ALL.to_vec());
        assert!(stats.iter().all(|s| s.attempts == 0));
        assert!(stats.iter().all(|s| s.last_fetch_at.is_none()));
    }

    #[test]
    fn test_serializes_camel_case() {
        let recorder = FetchStatsRecorder::new();
        recorder.record(
            &make_fetch(ActivityKind::Reminder, FetchStrategy::Indexed, None),
            3,
        );
        let json = serde_json::to_value(recorder.snapshot()).unwrap();
        let reminder_row = &json[1];
        assert_eq!(reminder_row["kind"], "reminder");
        assert_eq!(reminder_row["lastDurationMs"], 3);
        assert!(reminder_row.get("lastError").is_none());
    }
}
