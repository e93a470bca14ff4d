//! Persistent document store port
//!
//! The engine never talks to storage directly; hosts hand it an
//! [`ActivityStore`] implementation. Range queries are served from the
//! backend's scheduling-field index and fail with
//! [`StoreError::IndexUnavailable`] while that index is missing or still
//! building; `fetch_all` is the unbounded per-kind scan the planner falls
//! back to in that case.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::error::StoreError;
use crate::types::{Activity, ActivityKind};

/// Read access to the external activity store, scoped by owner.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Records of `kind` owned by `user_id` whose scheduling instant falls
    /// in `[from, to)`, ordered by scheduling instant. Records without a
    /// scheduling instant have no index entry and are never returned here.
    async fn query_range(
        &self,
        user_id: &str,
        kind: ActivityKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError>;

    /// Every record of `kind` owned by `user_id`, in no particular order,
    /// including records with no scheduling instant. Unbounded; only
    /// useful when the range index cannot serve.
    async fn fetch_all(
        &self,
        user_id: &str,
        kind: ActivityKind,
    ) -> Result<Vec<Activity>, StoreError>;
}

#[derive(Default)]
struct CallCounts {
    range: HashMap<ActivityKind, usize>,
    full: HashMap<ActivityKind, usize>,
}

/// In-memory [`ActivityStore`] for tests and embedded hosts.
///
/// Failure switches script the outages the planner must survive: a missing
/// range index per kind, a whole-store outage, and a broken full scan.
/// Call counters record which query path actually ran.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<Activity>>,
    range_index_down: RwLock<HashSet<ActivityKind>>,
    full_fetch_down: RwLock<HashSet<ActivityKind>>,
    offline: RwLock<bool>,
    latency: RwLock<Option<std::time::Duration>>,
    calls: Mutex<CallCounts>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Duplicates are kept as-is so tests can model a
    /// backend returning the same document twice.
    pub fn insert(&self, activity: Activity) {
        self.records.write().push(activity);
    }

    pub fn insert_all(&self, activities: Vec<Activity>) {
        self.records.write().extend(activities);
    }

    /// Simulate the range index for `kind` being missing or building.
    pub fn set_range_index_down(&self, kind: ActivityKind, down: bool) {
        let mut set = self.range_index_down.write();
        if down {
            set.insert(kind);
        } else {
            set.remove(&kind);
        }
    }

    /// Simulate the unbounded scan for `kind` failing.
    pub fn set_full_fetch_down(&self, kind: ActivityKind, down: bool) {
        let mut set = self.full_fetch_down.write();
        if down {
            set.insert(kind);
        } else {
            set.remove(&kind);
        }
    }

    /// Simulate the whole store being unreachable.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.write() = offline;
    }

    /// Delay every query by `latency`, so tests can race a slow load
    /// against navigation. `None` restores instant answers.
    pub fn set_latency(&self, latency: Option<std::time::Duration>) {
        *self.latency.write() = latency;
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.read();
        if let Some(duration) = latency {
            tokio::time::sleep(duration).await;
        }
    }

    pub fn range_query_count(&self, kind: ActivityKind) -> usize {
        self.calls.lock().range.get(&kind).copied().unwrap_or(0)
    }

    pub fn full_fetch_count(&self, kind: ActivityKind) -> usize {
        self.calls.lock().full.get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ActivityStore for InMemoryStore {
    async fn query_range(
        &self,
        user_id: &str,
        kind: ActivityKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError> {
        *self
            .calls
            .lock()
            .range
            .entry(kind)
            .or_insert(0) += 1;
        self.simulate_latency().await;

        if *self.offline.read() {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        if self.range_index_down.read().contains(&kind) {
            return Err(StoreError::IndexUnavailable {
                kind,
                detail: "range index not built".to_string(),
            });
        }

        let mut matched: Vec<Activity> = self
            .records
            .read()
            .iter()
            .filter(|a| a.kind == kind && a.user_id == user_id)
            .filter(|a| {
                a.scheduled_at
                    .map(|t| t >= from && t < to)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        matched.sort_by_key(|a| a.scheduled_at);
        Ok(matched)
    }

    async fn fetch_all(
        &self,
        user_id: &str,
        kind: ActivityKind,
    ) -> Result<Vec<Activity>, StoreError> {
        *self
            .calls
            .lock()
            .full
            .entry(kind)
            .or_insert(0) += 1;
        self.simulate_latency().await;

        if *self.offline.read() {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        if self.full_fetch_down.read().contains(&kind) {
            return Err(StoreError::Backend("full scan failed".to_string()));
        }

        Ok(self
            .records
            .read()
            .iter()
            .filter(|a| a.kind == kind && a.user_id == user_id)
            .cloned()
            .collect())
    }
}
