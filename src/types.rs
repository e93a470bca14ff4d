//! Core data model for the activity aggregation engine
//!
//! Three activity kinds share one flat record shape: events carry a start
//! and optional end, reminders carry a remind instant, tasks carry an
//! optional due date and a priority. Calendar placement always keys on the
//! scheduling instant (`scheduled_at`), never on `created_at`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three activity kinds the engine aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Event,
    Reminder,
    Task,
}

impl ActivityKind {
    /// All kinds, in the order month loads fetch them.
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::Event,
        ActivityKind::Reminder,
        ActivityKind::Task,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Event => "event",
            ActivityKind::Reminder => "reminder",
            ActivityKind::Task => "task",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "event" => Ok(ActivityKind::Event),
            "reminder" => Ok(ActivityKind::Reminder),
            "task" => Ok(ActivityKind::Task),
            _ => Err(format!("Unknown activity kind: {}", s)),
        }
    }
}

/// Lifecycle status of an activity.
///
/// Cancelled records stay visible in day buckets and list views; they are
/// only excluded from notification scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl ActivityStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActivityStatus::Cancelled)
    }
}

/// Where an activity came from: created by hand or extracted from email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityOrigin {
    Manual,
    Email,
}

/// Task priority. Ordered so `Low < Normal < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
}

/// A calendar activity as stored and displayed.
///
/// Kind-specific data rides in optional fields: `end_at` and `location` for
/// events, `priority` for tasks. `scheduled_at` is the scheduling instant —
/// event start, reminder time, or task due date. Tasks may have none, in
/// which case the record has no calendar placement at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ActivityStatus,
    pub origin: ActivityOrigin,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl Activity {
    /// Identity for duplicate suppression: ids are only unique per kind.
    pub fn dedup_key(&self) -> (ActivityKind, &str) {
        (self.kind, self.id.as_str())
    }
}

/// A calendar month, the unit of fetching and caching.
///
/// Fields are public for destructuring; use `new` when the month number
/// comes from outside the crate. Deserialization routes through the same
/// 1..=12 check, so a wire payload cannot carry an invalid month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCalendarMonth")]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

/// Unvalidated wire shape behind `CalendarMonth` deserialization.
#[derive(Deserialize)]
struct RawCalendarMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawCalendarMonth> for CalendarMonth {
    type Error = String;

    fn try_from(raw: RawCalendarMonth) -> Result<Self, Self::Error> {
        CalendarMonth::new(raw.year, raw.month)
            .ok_or_else(|| format!("month out of range: {}", raw.month))
    }
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First local day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last local day of the month: first of the next month minus one day.
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year.saturating_add(1), 1)
        } else {
            (self.year, self.month.saturating_add(1))
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Per-day aggregate counts backing one month-grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCounts {
    pub events: usize,
    pub reminders: usize,
    pub tasks: usize,
}

impl DayCounts {
    pub fn total(&self) -> usize {
        self.events + self.reminders + self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Full records for one selected day, grouped by kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayActivities {
    pub date: NaiveDate,
    pub events: Vec<Activity>,
    pub reminders: Vec<Activity>,
    pub tasks: Vec<Activity>,
}

impl DayActivities {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            events: Vec::new(),
            reminders: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.events.len() + self.reminders.len() + self.tasks.len()
    }
}

/// An activity due within the notification window.
///
/// Ephemeral: built from the cache snapshot on each scanner tick, handed to
/// subscribers, never persisted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCandidate {
    pub activity_id: String,
    pub kind: ActivityKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl NotificationCandidate {
    /// Build from an activity known to carry a scheduling instant.
    pub fn from_activity(activity: &Activity, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            activity_id: activity.id.clone(),
            kind: activity.kind,
            title: activity.title.clone(),
            description: activity.description.clone(),
            scheduled_at,
            location: activity.location.clone(),
            priority: activity.priority,
        }
    }
}

/// One scanner tick's emission: every candidate due within the window,
/// stamped so subscribers can correlate and de-duplicate across ticks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBatch {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub candidates: Vec<NotificationCandidate>,
}

/// Kind filter for paginated list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    All,
    Event,
    Reminder,
    Task,
}

impl KindFilter {
    pub fn matches(&self, kind: ActivityKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Event => kind == ActivityKind::Event,
            KindFilter::Reminder => kind == ActivityKind::Reminder,
            KindFilter::Task => kind == ActivityKind::Task,
        }
    }
}
