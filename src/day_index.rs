//! Day buckets over the cached month
//!
//! Pure reads over a cache snapshot: the month grid asks for counts per
//! visible day, the day panel asks for full records. Neither touches
//! storage — rendering a month costs snapshot reads, never a re-fetch.
//!
//! Bucket membership is decided by viewer-local day. Records without a
//! scheduling instant have no placement and simply never appear.

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::cache::CacheSnapshot;
use crate::dedup::dedup_activities;
use crate::local_date::local_day;
use crate::types::{Activity, DayActivities, DayCounts};

fn day_records(records: &[Activity], date: NaiveDate, tz: &Tz) -> Vec<Activity> {
    let mut matched: Vec<Activity> = records
        .iter()
        .filter(|a| {
            a.scheduled_at
                .map(|t| local_day(t, tz) == date)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    matched.sort_by(|a, b| (a.scheduled_at, &a.id).cmp(&(b.scheduled_at, &b.id)));
    matched
}

/// Full records scheduled on one viewer-local day, grouped by kind and
/// ordered by scheduling instant.
pub fn activities_for_day(snapshot: &CacheSnapshot, date: NaiveDate, tz: &Tz) -> DayActivities {
    DayActivities {
        date,
        events: dedup_activities(day_records(&snapshot.events, date, tz)),
        reminders: dedup_activities(day_records(&snapshot.reminders, date, tz)),
        tasks: dedup_activities(day_records(&snapshot.tasks, date, tz)),
    }
}

/// Per-kind counts for one viewer-local day — the payload behind a single
/// month-grid cell.
pub fn counts_for_day(snapshot: &CacheSnapshot, date: NaiveDate, tz: &Tz) -> DayCounts {
    let day = activities_for_day(snapshot, date, tz);
    DayCounts {
        events: day.events.len(),
        reminders: day.reminders.len(),
        tasks: day.tasks.len(),
    }
}
