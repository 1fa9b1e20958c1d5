//! Next-prayer resolution
//!
//! Walks a day's schedule in canonical order to find the upcoming prayer and
//! how long remains until it.

use chrono::{Duration, NaiveDateTime};

use crate::data::{PrayerName, PrayerSchedule};

/// Time left until a prayer, truncated to whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    /// Splits a duration into whole hours, minutes and seconds
    ///
    /// Sub-second precision is truncated, not rounded.
    pub fn from_duration(duration: Duration) -> Self {
        let total = duration.num_seconds();
        Self {
            hours: total / 3600,
            minutes: total % 3600 / 60,
            seconds: total % 60,
        }
    }

    /// Whole minutes, ignoring the seconds part
    pub fn total_minutes(&self) -> i64 {
        self.hours * 60 + self.minutes
    }
}

/// The upcoming prayer relative to some moment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPrayer {
    pub name: PrayerName,
    /// When it starts
    pub at: NaiveDateTime,
    pub remaining: Remaining,
    /// The day's prayers are over and `at` is today's first time moved to
    /// tomorrow, an estimate until tomorrow's schedule is fetched
    pub wrapped: bool,
}

/// Finds the prayer that follows `now`
///
/// The first adjacent pair `(prev, next)` with `prev <= now < next` yields
/// `next`. Before the first prayer the first prayer is next; at or after the
/// last one the first prayer is next again, on the following day.
///
/// # Returns
/// * `Some(NextPrayer)` for any non-empty schedule
/// * `None` if the schedule has no entries
pub fn next_prayer(schedule: &PrayerSchedule, now: NaiveDateTime) -> Option<NextPrayer> {
    let moments: Vec<(PrayerName, NaiveDateTime)> = schedule.moments().collect();
    let &(first_name, first_at) = moments.first()?;

    let between = moments
        .windows(2)
        .find(|pair| pair[0].1 <= now && now < pair[1].1)
        .map(|pair| pair[1]);

    let (name, at, wrapped) = match between {
        Some((name, at)) => (name, at, false),
        None if now < first_at => (first_name, first_at, false),
        None => (first_name, first_at + Duration::days(1), true),
    };

    Some(NextPrayer {
        name,
        at,
        remaining: Remaining::from_duration(at - now),
        wrapped,
    })
}
