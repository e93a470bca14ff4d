//! Due-soon notification scanning
//!
//! A fixed-period background task over the in-memory month cache. Each
//! tick reads the current snapshot through the shared cache handle — never
//! a copy captured at arm time — and emits one batch of candidates whose
//! scheduling instant falls inside `[now, now + window)`. Cancelled
//! activities never qualify; tasks without a due date have nothing to be
//! due. Presentation and cross-tick re-notify suppression belong to
//! subscribers, not the scanner.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::{CacheSnapshot, MonthCache};
use crate::dedup::dedup_activities;
use crate::types::{NotificationBatch, NotificationCandidate};

/// Batches a slow subscriber can fall behind by before it starts missing
/// them. Missing a batch is harmless — the next tick re-emits whatever is
/// still due.
const NOTIFICATION_CHANNEL_SIZE: usize = 16;

/// Candidates due within `[now, now + window)`, soonest first.
///
/// The instant equal to `now` is included; the instant equal to
/// `now + window` is excluded. The merged cross-kind list is deduplicated
/// before filtering so one record never yields two candidates.
pub fn candidates_in_window(
    snapshot: &CacheSnapshot,
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<NotificationCandidate> {
    let window_end = now + window;
    let merged = dedup_activities(snapshot.iter_all().cloned().collect());
    let mut candidates: Vec<NotificationCandidate> = merged
        .iter()
        .filter(|a| !a.status.is_cancelled())
        .filter_map(|a| {
            let at = a.scheduled_at?;
            (at >= now && at < window_end).then(|| NotificationCandidate::from_activity(a, at))
        })
        .collect();
    candidates.sort_by(|a, b| (a.scheduled_at, &a.activity_id).cmp(&(b.scheduled_at, &b.activity_id)));
    candidates
}

/// Background scanner with two states: idle (no task) and armed (tick
/// loop running). Every exit path — explicit disarm, engine dispose, or
/// drop — cancels the task.
pub struct NotificationScanner {
    cache: Arc<MonthCache>,
    poll_interval: std::time::Duration,
    window: Duration,
    sender: broadcast::Sender<NotificationBatch>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationScanner {
    pub fn new(cache: Arc<MonthCache>, poll_interval_secs: u64, window_hours: u32) -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self {
            cache,
            poll_interval: std::time::Duration::from_secs(poll_interval_secs.max(1)),
            window: Duration::hours(window_hours as i64),
            sender,
            task: Mutex::new(None),
        }
    }

    /// Receive future batches. Works before or after arming; a receiver
    /// that falls behind skips to the newest batches.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationBatch> {
        self.sender.subscribe()
    }

    pub fn is_armed(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Start the tick loop. Arming an armed scanner is a no-op. Must be
    /// called from within a Tokio runtime.
    pub fn arm(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            log::debug!("Notification scanner already armed");
            return;
        }

        let cache = Arc::clone(&self.cache);
        let sender = self.sender.clone();
        let poll_interval = self.poll_interval;
        let window = self.window;

        *task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;

                let now = Utc::now();
                let snapshot = cache.snapshot();
                let candidates = candidates_in_window(&snapshot, now, window);
                if candidates.is_empty() {
                    continue;
                }

                log::debug!(
                    "Scanner tick: {} candidate(s) due within {}h",
                    candidates.len(),
                    window.num_hours()
                );
                let batch = NotificationBatch {
                    id: Uuid::new_v4(),
                    generated_at: now,
                    window_start: now,
                    window_end: now + window,
                    candidates,
                };
                // No live subscribers is fine; keep ticking so later
                // subscribers pick up later batches.
                let _ = sender.send(batch);
            }
        }));
        log::info!(
            "Notification scanner armed: every {}s, {}h window",
            self.poll_interval.as_secs(),
            self.window.num_hours()
        );
    }

    /// Cancel the tick loop. Disarming an idle scanner is a no-op.
    pub fn disarm(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            log::info!("Notification scanner disarmed");
        }
    }
}

impl Drop for NotificationScanner {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Activity, ActivityKind, ActivityOrigin, ActivityStatus, CalendarMonth,
    };
    use chrono::TimeZone;

    fn make_activity(
        kind: ActivityKind,
        id: &str,
        status: ActivityStatus,
        at: Option<DateTime<Utc>>,
    ) -> Activity {
        Activity {
            id: id.to_string(),
            kind,
            user_id: "u1".to_string(),
            title: id.to_string(),
            description: None,
            status,
            origin: ActivityOrigin::Manual,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            scheduled_at: at,
            end_at: None,
            location: None,
            priority: None,
        }
    }

    fn snapshot_of(activities: Vec<Activity>) -> CacheSnapshot {
        let mut snapshot = CacheSnapshot::default();
        for activity in activities {
            match activity.kind {
                ActivityKind::Event => snapshot.events.push(activity),
                ActivityKind::Reminder => snapshot.reminders.push(activity),
                ActivityKind::Task => snapshot.tasks.push(activity),
            }
        }
        snapshot
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_boundaries_are_half_open() {
        let now = fixed_now();
        let snapshot = snapshot_of(vec![
            make_activity(ActivityKind::Event, "at-now", ActivityStatus::Pending, Some(now)),
            make_activity(
                ActivityKind::Event,
                "inside",
                ActivityStatus::Pending,
                Some(now + Duration::hours(23) + Duration::minutes(59)),
            ),
            make_activity(
                ActivityKind::Event,
                "at-window-end",
                ActivityStatus::Pending,
                Some(now + Duration::hours(24)),
            ),
            make_activity(
                ActivityKind::Event,
                "already-past",
                ActivityStatus::Pending,
                Some(now - Duration::minutes(1)),
            ),
        ]);

        let candidates = candidates_in_window(&snapshot, now, Duration::hours(24));
        let ids: Vec<&str> = candidates.iter().map(|c| c.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["at-now", "inside"]);
    }

    #[test]
    fn test_cancelled_and_undated_never_qualify() {
        let now = fixed_now();
        let snapshot = snapshot_of(vec![
            make_activity(
                ActivityKind::Event,
                "cancelled",
                ActivityStatus::Cancelled,
                Some(now + Duration::hours(1)),
            ),
            make_activity(ActivityKind::Task, "undated", ActivityStatus::Pending, None),
            make_activity(
                ActivityKind::Task,
                "due",
                ActivityStatus::Pending,
                Some(now + Duration::hours(2)),
            ),
        ]);

        let candidates = candidates_in_window(&snapshot, now, Duration::hours(24));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].activity_id, "due");
    }

    #[test]
    fn test_completed_still_qualifies() {
        // Only cancellation suppresses a notification; a completed task
        // with an upcoming due instant is still surfaced.
        let now = fixed_now();
        let snapshot = snapshot_of(vec![make_activity(
            ActivityKind::Task,
            "done-early",
            ActivityStatus::Completed,
            Some(now + Duration::hours(3)),
        )]);

        let candidates = candidates_in_window(&snapshot, now, Duration::hours(24));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_candidates_sorted_soonest_first() {
        let now = fixed_now();
        let snapshot = snapshot_of(vec![
            make_activity(
                ActivityKind::Task,
                "later",
                ActivityStatus::Pending,
                Some(now + Duration::hours(20)),
            ),
            make_activity(
                ActivityKind::Reminder,
                "soon",
                ActivityStatus::Pending,
                Some(now + Duration::minutes(30)),
            ),
            make_activity(
                ActivityKind::Event,
                "middle",
                ActivityStatus::Pending,
                Some(now + Duration::hours(6)),
            ),
        ]);

        let candidates = candidates_in_window(&snapshot, now, Duration::hours(24));
        let ids: Vec<&str> = candidates.iter().map(|c| c.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "middle", "later"]);
    }

    #[test]
    fn test_duplicate_record_yields_one_candidate() {
        let now = fixed_now();
        let due = Some(now + Duration::hours(1));
        let snapshot = snapshot_of(vec![
            make_activity(ActivityKind::Reminder, "r1", ActivityStatus::Pending, due),
            make_activity(ActivityKind::Reminder, "r1", ActivityStatus::Pending, due),
        ]);

        let candidates = candidates_in_window(&snapshot, now, Duration::hours(24));
        assert_eq!(candidates.len(), 1);
    }

    /// Route scanner logs through the test harness for `--nocapture` runs.
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cache_with_due_activity(minutes_ahead: i64) -> Arc<MonthCache> {
        let cache = Arc::new(MonthCache::new());
        let today = Utc::now().date_naive();
        let token = cache.begin_load(CalendarMonth::from_date(today));
        cache.replace_for(
            token,
            ActivityKind::Event,
            vec![make_activity(
                ActivityKind::Event,
                "due-soon",
                ActivityStatus::Approved,
                Some(Utc::now() + Duration::minutes(minutes_ahead)),
            )],
        );
        cache
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_scanner_emits_batches() {
        init_logging();
        let cache = cache_with_due_activity(60);
        let scanner = NotificationScanner::new(cache, 30, 24);
        let mut rx = scanner.subscribe();

        scanner.arm();
        assert!(scanner.is_armed());

        let batch = tokio::time::timeout(std::time::Duration::from_secs(90), rx.recv())
            .await
            .expect("scanner should tick within the timeout")
            .expect("channel open");
        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(batch.candidates[0].activity_id, "due-soon");
        assert_eq!(batch.window_end - batch.window_start, Duration::hours(24));

        scanner.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_is_idempotent() {
        let cache = cache_with_due_activity(60);
        let scanner = NotificationScanner::new(cache, 30, 24);
        let mut rx = scanner.subscribe();

        scanner.arm();
        scanner.arm();

        let _ = tokio::time::timeout(std::time::Duration::from_secs(45), rx.recv())
            .await
            .expect("first tick")
            .expect("channel open");
        // A double-armed scanner would have queued a second batch from the
        // duplicate task by now.
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        scanner.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_stops_ticks() {
        init_logging();
        let cache = cache_with_due_activity(60);
        let scanner = NotificationScanner::new(cache, 30, 24);
        let mut rx = scanner.subscribe();

        scanner.arm();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(90), rx.recv())
            .await
            .expect("first tick")
            .expect("channel open");

        scanner.disarm();
        assert!(!scanner.is_armed());

        let after = tokio::time::timeout(std::time::Duration::from_secs(120), rx.recv()).await;
        assert!(after.is_err(), "no batches after disarm");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_window_emits_nothing() {
        // Activity far outside the window: ticks happen, batches don't.
        let cache = cache_with_due_activity(60 * 24 * 10);
        let scanner = NotificationScanner::new(cache, 30, 24);
        let mut rx = scanner.subscribe();

        scanner.arm();
        let result = tokio::time::timeout(std::time::Duration::from_secs(95), rx.recv()).await;
        assert!(result.is_err(), "three ticks, no qualifying candidates");

        scanner.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_reads_current_cache_not_arm_time_copy() {
        // Armed over an empty cache; records arriving later must still be
        // picked up because every tick re-reads the shared cache.
        let cache = Arc::new(MonthCache::new());
        let scanner = NotificationScanner::new(Arc::clone(&cache), 30, 24);
        let mut rx = scanner.subscribe();
        scanner.arm();

        let token = cache.begin_load(CalendarMonth::from_date(Utc::now().date_naive()));
        cache.replace_for(
            token,
            ActivityKind::Reminder,
            vec![make_activity(
                ActivityKind::Reminder,
                "late-arrival",
                ActivityStatus::Pending,
                Some(Utc::now() + Duration::hours(2)),
            )],
        );

        let batch = tokio::time::timeout(std::time::Duration::from_secs(90), rx.recv())
            .await
            .expect("tick after cache update")
            .expect("channel open");
        assert_eq!(batch.candidates[0].activity_id, "late-arrival");

        scanner.disarm();
    }
}
