//! Viewer-local calendar day math
//!
//! Every placement decision in the engine goes through `local_day`: convert
//! the stored UTC instant to the viewer's timezone, then take the calendar
//! date there. Comparing raw instants or UTC dates puts late-evening and
//! early-morning records on the wrong day for viewers away from UTC.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::CalendarMonth;

/// The viewer-local calendar day an instant falls on.
pub fn local_day(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Canonical `YYYY-MM-DD` key for an instant's viewer-local day.
pub fn local_day_key(instant: DateTime<Utc>, tz: &Tz) -> String {
    local_day(instant, tz).format("%Y-%m-%d").to_string()
}

/// Resolve local midnight on `date` to a UTC instant, handling DST edges.
///
/// Some zones skip or repeat midnight at a DST transition. A repeated
/// midnight resolves to its first pass; a skipped midnight resolves to the
/// first hour that exists after it.
pub fn local_midnight_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.to_utc(),
        LocalResult::Ambiguous(first, _) => first.to_utc(),
        LocalResult::None => {
            // Spring-forward gap: this midnight was skipped. Walk forward an
            // hour at a time; tz db gaps are at most two hours wide.
            for hours_ahead in 1..=3i64 {
                let probe = naive + Duration::hours(hours_ahead);
                if let LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) =
                    tz.from_local_datetime(&probe)
                {
                    log::warn!(
                        "DST gap at midnight {} in {}; using {:02}:00 local",
                        date,
                        tz,
                        hours_ahead
                    );
                    return dt.to_utc();
                }
            }
            log::warn!(
                "Could not resolve local midnight {} in {}; treating as UTC",
                date,
                tz
            );
            Utc.from_utc_datetime(&naive)
        }
    }
}

/// Absolute query bounds for a month fetch, widened one local day per side.
///
/// Returns the half-open instant range `[lower, upper)`. Range indexes
/// order records by stored instant while month membership is decided by
/// viewer-local day, so a record can sit on a neighboring absolute day
/// relative to its local placement. The extra day on each side keeps those
/// records inside the fetch; day bucketing filters per-day afterwards.
pub fn month_fetch_bounds(month: CalendarMonth, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let lower_day = month.first_day().pred_opt().unwrap_or(NaiveDate::MIN);
    // Natural close is midnight after the last day; widen one more. Checked
    // steps: an invalid month saturates its day lookups to the date range
    // limits, and plain arithmetic panics there.
    let upper_day = month
        .last_day()
        .checked_add_days(Days::new(2))
        .unwrap_or(NaiveDate::MAX);
    (
        local_midnight_utc(tz, lower_day),
        local_midnight_utc(tz, upper_day),
    )
}
