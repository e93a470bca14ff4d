//! Duplicate suppression for fetched and merged activity lists
//!
//! Overlapping fetch windows and merged multi-kind views can surface the
//! same record more than once. Identity is `(kind, id)` — ids are only
//! unique within a kind. This runs at exactly two boundaries: after a fetch
//! before the cache write, and before display when per-kind lists are
//! merged. Call sites never filter ad hoc.

use std::collections::HashSet;

use crate::types::{Activity, ActivityKind};

/// Drop every repeat of an already-seen `(kind, id)`, keeping first-seen
/// order. Idempotent: a second pass over the output changes nothing.
pub fn dedup_activities(activities: Vec<Activity>) -> Vec<Activity> {
    let mut seen: HashSet<(ActivityKind, String)> = HashSet::with_capacity(activities.len());
    let mut out = Vec::with_capacity(activities.len());
    for activity in activities {
        if seen.insert((activity.kind, activity.id.clone())) {
            out.push(activity);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityOrigin, ActivityStatus};
    use chrono::{TimeZone, Utc};

    fn make_activity(kind: ActivityKind, id: &str, title: &str) -> Activity {
        Activity {
            id: id.to_string(),
            kind,
            user_id: "user-1".to_string(),
            title: title.to_string(),
            description: None,
            status: ActivityStatus::Pending,
            origin: ActivityOrigin::Manual,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            scheduled_at: Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()),
            end_at: None,
            location: None,
            priority: None,
        }
    }

    #[test]
    fn test_repeat_id_keeps_first_seen() {
        let input = vec![
            make_activity(ActivityKind::Event, "e1", "first copy"),
            make_activity(ActivityKind::Event, "e2", "other"),
            make_activity(ActivityKind::Event, "e1", "second copy"),
        ];
        let result = dedup_activities(input);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "e1");
        assert_eq!(result[0].title, "first copy");
        assert_eq!(result[1].id, "e2");
    }

    #[test]
    fn test_same_id_across_kinds_is_not_a_duplicate() {
        let input = vec![
            make_activity(ActivityKind::Event, "shared", "event"),
            make_activity(ActivityKind::Task, "shared", "task"),
        ];
        let result = dedup_activities(input);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            make_activity(ActivityKind::Reminder, "r1", "a"),
            make_activity(ActivityKind::Reminder, "r1", "b"),
            make_activity(ActivityKind::Reminder, "r2", "c"),
        ];
        let once = dedup_activities(input);
        let twice = dedup_activities(once.clone());
        assert_eq!(once.len(), twice.len());
        let ids: Vec<&str> = once.iter().map(|a| a.id.as_str()).collect();
        let ids_twice: Vec<&str> = twice.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ids_twice);
    }

    #[test]
    fn test_order_preserved_for_unique_input() {
        let input = vec![
            make_activity(ActivityKind::Task, "t3", "z"),
            make_activity(ActivityKind::Task, "t1", "a"),
            make_activity(ActivityKind::Task, "t2", "m"),
        ];
        let result = dedup_activities(input);
        let ids: Vec<&str> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t1", "t2"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_activities(Vec::new()).is_empty());
    }
}
