//! Month fetch planning
//!
//! Two strategies sit behind one entry point. The indexed strategy asks
//! the store for the widened instant range; when the store answers that
//! its range index is unavailable, the scan fallback fetches the owner's
//! whole kind and keeps records whose viewer-local day falls inside the
//! displayed month. The switch keys on the typed error discriminant,
//! never on message text, and storage failures resolve to an empty fetch
//! with diagnostics rather than an error the caller must handle.

use std::sync::Arc;

use chrono_tz::Tz;
use dashmap::DashMap;

use crate::dedup::dedup_activities;
use crate::local_date::{local_day, month_fetch_bounds};
use crate::store::ActivityStore;
use crate::types::{Activity, ActivityKind, CalendarMonth};

/// Which strategy served a month fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    Indexed,
    ScanFallback,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::ScanFallback => "scan_fallback",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::ScanFallback)
    }
}

/// Outcome of one kind's month fetch. Always resolves; `error` carries the
/// failure when even the serving strategy came back empty-handed.
#[derive(Debug, Clone)]
pub struct MonthFetch {
    pub kind: ActivityKind,
    pub records: Vec<Activity>,
    pub strategy: FetchStrategy,
    /// First-time degradation notice, at most one per kind per planner.
    pub advisory: Option<String>,
    pub error: Option<String>,
}

/// Plans and runs per-kind month fetches against the store port.
pub struct QueryPlanner {
    store: Arc<dyn ActivityStore>,
    /// Kinds that have already produced a degraded-mode advisory.
    advised_degraded: DashMap<ActivityKind, ()>,
}

impl QueryPlanner {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self {
            store,
            advised_degraded: DashMap::new(),
        }
    }

    /// Fetch one kind for the displayed month.
    ///
    /// The indexed path is tried first on every call — a rebuilt index is
    /// picked up again without restarting. Results are deduplicated here,
    /// at the fetch boundary, before anything reaches the cache.
    pub async fn fetch_month(
        &self,
        user_id: &str,
        kind: ActivityKind,
        month: CalendarMonth,
        tz: &Tz,
    ) -> MonthFetch {
        let (from, to) = month_fetch_bounds(month, tz);
        match self.store.query_range(user_id, kind, from, to).await {
            Ok(records) => MonthFetch {
                kind,
                records: dedup_activities(records),
                strategy: FetchStrategy::Indexed,
                advisory: None,
                error: None,
            },
            Err(err) if err.is_index_unavailable() => {
                log::warn!(
                    "Range index unavailable for {} ({}); scanning instead",
                    kind,
                    err
                );
                self.scan_fallback(user_id, kind, month, tz).await
            }
            Err(err) => {
                log::warn!("Month fetch for {} {} failed: {}", kind, month, err);
                MonthFetch {
                    kind,
                    records: Vec::new(),
                    strategy: FetchStrategy::Indexed,
                    advisory: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Unbounded fetch filtered by local-day month membership. Records
    /// without a scheduling instant have no placement and are dropped.
    async fn scan_fallback(
        &self,
        user_id: &str,
        kind: ActivityKind,
        month: CalendarMonth,
        tz: &Tz,
    ) -> MonthFetch {
        let advisory = self.first_degradation_notice(kind);
        match self.store.fetch_all(user_id, kind).await {
            Ok(all) => {
                let total = all.len();
                let in_month: Vec<Activity> = all
                    .into_iter()
                    .filter(|a| {
                        a.scheduled_at
                            .map(|t| month.contains(local_day(t, tz)))
                            .unwrap_or(false)
                    })
                    .collect();
                let records = dedup_activities(in_month);
                log::info!(
                    "Scan fallback for {} {}: kept {} of {} records",
                    kind,
                    month,
                    records.len(),
                    total
                );
                MonthFetch {
                    kind,
                    records,
                    strategy: FetchStrategy::ScanFallback,
                    advisory,
                    error: None,
                }
            }
            Err(err) => {
                log::warn!("Scan fallback for {} {} failed: {}", kind, month, err);
                MonthFetch {
                    kind,
                    records: Vec::new(),
                    strategy: FetchStrategy::ScanFallback,
                    advisory,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// One degraded-mode notice per kind for this planner's lifetime.
    fn first_degradation_notice(&self, kind: ActivityKind) -> Option<String> {
        if self.advised_degraded.insert(kind, ()).is_none() {
            Some(format!(
                "{} lookups are running without their range index; \
                 month views may load slower until it is rebuilt",
                kind
            ))
        } else {
            None
        }
    }
}
