//! Per-month activity cache
//!
//! One month is resident at a time. Writes replace a whole kind list;
//! nothing is patched in place. Every load is stamped with a token so
//! responses that arrive after the user has navigated away are discarded
//! instead of overwriting the month now on screen.

use parking_lot::RwLock;

use crate::types::{Activity, ActivityKind, CalendarMonth};

/// Point-in-time copy of the cache, taken under one read lock.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    pub month: Option<CalendarMonth>,
    pub events: Vec<Activity>,
    pub reminders: Vec<Activity>,
    pub tasks: Vec<Activity>,
}

impl CacheSnapshot {
    pub fn kind(&self, kind: ActivityKind) -> &[Activity] {
        match kind {
            ActivityKind::Event => &self.events,
            ActivityKind::Reminder => &self.reminders,
            ActivityKind::Task => &self.tasks,
        }
    }

    /// All cached records, events first, then reminders, then tasks.
    pub fn iter_all(&self) -> impl Iterator<Item = &Activity> {
        self.events
            .iter()
            .chain(self.reminders.iter())
            .chain(self.tasks.iter())
    }

    pub fn total(&self) -> usize {
        self.events.len() + self.reminders.len() + self.tasks.len()
    }
}

#[derive(Default)]
struct CacheInner {
    generation: u64,
    month: Option<CalendarMonth>,
    events: Vec<Activity>,
    reminders: Vec<Activity>,
    tasks: Vec<Activity>,
}

impl CacheInner {
    fn kind_mut(&mut self, kind: ActivityKind) -> &mut Vec<Activity> {
        match kind {
            ActivityKind::Event => &mut self.events,
            ActivityKind::Reminder => &mut self.reminders,
            ActivityKind::Task => &mut self.tasks,
        }
    }
}

/// Shared month cache. Readers (day index, scanner) go through
/// [`MonthCache::snapshot`]; the only writers are month loads carrying the
/// token their load started under.
#[derive(Default)]
pub struct MonthCache {
    inner: RwLock<CacheInner>,
}

impl MonthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new displayed month and clear all kinds. Returns the load
    /// token the month's fetches must present when writing.
    pub fn begin_load(&self, month: CalendarMonth) -> u64 {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.month = Some(month);
        inner.events.clear();
        inner.reminders.clear();
        inner.tasks.clear();
        inner.generation
    }

    /// Replace one kind's list, but only if `token` still matches the
    /// current load. Returns false when the view has moved on and the
    /// write was discarded.
    pub fn replace_for(&self, token: u64, kind: ActivityKind, records: Vec<Activity>) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != token {
            log::debug!(
                "Discarding stale {} results ({} records): month view moved on",
                kind,
                records.len()
            );
            return false;
        }
        *inner.kind_mut(kind) = records;
        true
    }

    pub fn month(&self) -> Option<CalendarMonth> {
        self.inner.read().month
    }

    pub fn get(&self, kind: ActivityKind) -> Vec<Activity> {
        match kind {
            ActivityKind::Event => self.inner.read().events.clone(),
            ActivityKind::Reminder => self.inner.read().reminders.clone(),
            ActivityKind::Task => self.inner.read().tasks.clone(),
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let inner = self.inner.read();
        CacheSnapshot {
            month: inner.month,
            events: inner.events.clone(),
            reminders: inner.reminders.clone(),
            tasks: inner.tasks.clone(),
        }
    }

    /// Empty everything and invalidate outstanding load tokens.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.month = None;
        inner.events.clear();
        inner.reminders.clear();
        inner.tasks.clear();
    }
}
