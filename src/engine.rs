//! Engine facade
//!
//! One engine instance per signed-in user: explicitly constructed with its
//! store port and config, explicitly disposed. Month selection drives
//! everything — the three kind fetches run concurrently, land in the cache
//! independently, and every read (day buckets, filtered pages, the
//! notification scanner) serves from that cache until the next selection.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::cache::MonthCache;
use crate::config::EngineConfig;
use crate::day_index;
use crate::dedup::dedup_activities;
use crate::error::EngineError;
use crate::local_date::local_day;
use crate::pagination::{paginate, Page};
use crate::planner::QueryPlanner;
use crate::scanner::NotificationScanner;
use crate::stats::{FetchStatsRecorder, KindFetchStats};
use crate::store::ActivityStore;
use crate::types::{
    Activity, ActivityKind, CalendarMonth, DayActivities, DayCounts, KindFilter,
    NotificationBatch,
};

/// Outcome of one kind within a month load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindLoadReport {
    pub kind: ActivityKind,
    pub fetched: usize,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a whole month load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthLoadReport {
    pub month: CalendarMonth,
    pub kinds: Vec<KindLoadReport>,
    /// Degradation notices to surface once; empty after the first time a
    /// kind degrades in this engine's lifetime.
    pub advisories: Vec<String>,
    /// True when the user navigated away before this load finished; its
    /// results were discarded and the report is informational only.
    pub superseded: bool,
}

struct KindOutcome {
    report: KindLoadReport,
    advisory: Option<String>,
    accepted: bool,
}

/// Month-at-a-time activity aggregation for one user.
pub struct AgendaEngine {
    user_id: String,
    tz: Tz,
    page_size: usize,
    planner: QueryPlanner,
    cache: Arc<MonthCache>,
    scanner: NotificationScanner,
    stats: FetchStatsRecorder,
}

impl AgendaEngine {
    /// Build an engine for one user. Fails only on unusable config; the
    /// store is not contacted until the first month selection.
    pub fn new(
        store: Arc<dyn ActivityStore>,
        config: EngineConfig,
        user_id: impl Into<String>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let tz = config.resolve_timezone();
        let cache = Arc::new(MonthCache::new());
        let scanner = NotificationScanner::new(
            Arc::clone(&cache),
            config.scan_interval_secs,
            config.notification_window_hours,
        );
        Ok(Self {
            user_id: user_id.into(),
            tz,
            page_size: config.page_size,
            planner: QueryPlanner::new(store),
            cache,
            scanner,
            stats: FetchStatsRecorder::new(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn displayed_month(&self) -> Option<CalendarMonth> {
        self.cache.month()
    }

    /// Display a month: stamp and clear the cache, fetch all three kinds
    /// concurrently, and write each kind into the cache as it lands. A
    /// load the user has navigated away from mid-flight reports
    /// `superseded` and changes nothing.
    pub async fn select_month(&self, month: CalendarMonth) -> MonthLoadReport {
        let token = self.cache.begin_load(month);
        let started = Instant::now();

        let (events, reminders, tasks) = tokio::join!(
            self.fetch_and_store(token, ActivityKind::Event, month),
            self.fetch_and_store(token, ActivityKind::Reminder, month),
            self.fetch_and_store(token, ActivityKind::Task, month),
        );

        let mut report = MonthLoadReport {
            month,
            kinds: Vec::with_capacity(3),
            advisories: Vec::new(),
            superseded: false,
        };
        for outcome in [events, reminders, tasks] {
            if !outcome.accepted {
                report.superseded = true;
            }
            if let Some(advisory) = outcome.advisory {
                report.advisories.push(advisory);
            }
            report.kinds.push(outcome.report);
        }

        let total: usize = report.kinds.iter().map(|k| k.fetched).sum();
        if report.superseded {
            log::info!("Load of {} for {} superseded mid-flight", month, self.user_id);
        } else {
            log::info!(
                "Loaded {} for {}: {} records in {}ms",
                month,
                self.user_id,
                total,
                started.elapsed().as_millis()
            );
        }
        report
    }

    async fn fetch_and_store(
        &self,
        token: u64,
        kind: ActivityKind,
        month: CalendarMonth,
    ) -> KindOutcome {
        let started = Instant::now();
        let mut fetch = self
            .planner
            .fetch_month(&self.user_id, kind, month, &self.tz)
            .await;
        self.stats
            .record(&fetch, started.elapsed().as_millis() as u64);

        let records = std::mem::take(&mut fetch.records);
        let fetched = records.len();
        let accepted = self.cache.replace_for(token, kind, records);
        KindOutcome {
            report: KindLoadReport {
                kind,
                fetched,
                degraded: fetch.strategy.is_degraded(),
                error: fetch.error,
            },
            advisory: fetch.advisory,
            accepted,
        }
    }

    /// Rebuild the currently displayed month through the same fetch path.
    /// Answers `None` when no month is selected.
    pub async fn refresh(&self) -> Option<MonthLoadReport> {
        let month = self.cache.month()?;
        Some(self.select_month(month).await)
    }

    /// Records on one local day of the displayed month, grouped by kind.
    pub fn select_day(&self, date: NaiveDate) -> DayActivities {
        if !self.is_displayed(date) {
            return DayActivities::empty(date);
        }
        day_index::activities_for_day(&self.cache.snapshot(), date, &self.tz)
    }

    /// Month-grid counts for one local day of the displayed month.
    pub fn counts_for_day(&self, date: NaiveDate) -> DayCounts {
        if !self.is_displayed(date) {
            return DayCounts::default();
        }
        day_index::counts_for_day(&self.cache.snapshot(), date, &self.tz)
    }

    // Out-of-month days answer empty. The indexed path caches a one-day
    // skirt around the month that the scan path never sees; serving skirt
    // days would make answers depend on which path ran.
    fn is_displayed(&self, date: NaiveDate) -> bool {
        self.cache
            .month()
            .map(|m| m.contains(date))
            .unwrap_or(false)
    }

    /// One page of the displayed month's activities under a kind filter,
    /// ordered by scheduling instant.
    pub fn filtered_page(&self, filter: KindFilter, page: usize) -> Page<Activity> {
        let snapshot = self.cache.snapshot();
        let month = snapshot.month;
        let mut merged: Vec<Activity> = dedup_activities(
            snapshot
                .iter_all()
                .filter(|a| filter.matches(a.kind))
                .cloned()
                .collect(),
        );
        merged.retain(|a| match (a.scheduled_at, month) {
            (Some(at), Some(m)) => m.contains(local_day(at, &self.tz)),
            _ => false,
        });
        merged.sort_by(|a, b| {
            (a.scheduled_at, a.kind.as_str(), &a.id).cmp(&(b.scheduled_at, b.kind.as_str(), &b.id))
        });
        paginate(&merged, self.page_size, page)
    }

    /// Earliest non-cancelled activity scheduled at or after `now` in the
    /// displayed month's cache.
    pub fn next_upcoming(&self, now: DateTime<Utc>) -> Option<Activity> {
        let snapshot = self.cache.snapshot();
        dedup_activities(snapshot.iter_all().cloned().collect())
            .into_iter()
            .filter(|a| !a.status.is_cancelled())
            .filter(|a| a.scheduled_at.map(|t| t >= now).unwrap_or(false))
            .min_by_key(|a| (a.scheduled_at, a.id.clone()))
    }

    /// Start due-soon scanning. Idempotent; must run inside a Tokio
    /// runtime.
    pub fn arm_scanner(&self) {
        self.scanner.arm();
    }

    pub fn disarm_scanner(&self) {
        self.scanner.disarm();
    }

    pub fn scanner_armed(&self) -> bool {
        self.scanner.is_armed()
    }

    /// Receive scanner batches. How they are presented — and whether a
    /// candidate already shown last tick is shown again — is the
    /// subscriber's decision.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationBatch> {
        self.scanner.subscribe()
    }

    /// Per-kind fetch diagnostics for this instance.
    pub fn fetch_stats(&self) -> Vec<KindFetchStats> {
        self.stats.snapshot()
    }

    /// Tear down: stop the scanner and drop cached state. In-flight loads
    /// resolve as superseded. Dropping the engine without calling this
    /// still cancels the scanner.
    pub fn dispose(&self) {
        self.scanner.disarm();
        self.cache.clear();
        log::info!("Engine for {} disposed", self.user_id);
    }
}
