//! Core data models for adhan
//!
//! This module contains the prayer names, the daily schedule type, and the
//! clients that fetch schedules from upstream sources.

pub mod aladhan;
pub mod fetcher;
pub mod markup;
pub mod pattern;

pub use aladhan::AladhanClient;
pub use fetcher::{normalize_time, FetchError, Fetcher};
pub use markup::MarkupClient;
pub use pattern::PatternClient;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

/// A named prayer time within a day
///
/// Variant order is the chronological order of the day, so the derived `Ord`
/// is the canonical sequence used by the resolver and the cache columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrayerName {
    Fajr,
    FajrIqamah,
    Sunrise,
    Dhuhr,
    DhuhrIqamah,
    Asr,
    AsrIqamah,
    Maghrib,
    MaghribIqamah,
    Isha,
    IshaIqamah,
}

impl PrayerName {
    /// The prayers every source produces and the cache stores, in order
    pub const BASE: [PrayerName; 6] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// The five obligatory prayers; a schedule missing any of these is unusable
    pub const OBLIGATORY: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// Human-readable label, also used as the CSV column and JSON timing key
    pub fn label(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::FajrIqamah => "Fajr Iqamah",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::DhuhrIqamah => "Dhuhr Iqamah",
            PrayerName::Asr => "Asr",
            PrayerName::AsrIqamah => "Asr Iqamah",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::MaghribIqamah => "Maghrib Iqamah",
            PrayerName::Isha => "Isha",
            PrayerName::IshaIqamah => "Isha Iqamah",
        }
    }

    /// Parses a label case-insensitively, accepting common transliterations
    ///
    /// # Returns
    /// * `Some(PrayerName)` if the label names a known prayer
    /// * `None` otherwise
    pub fn from_label(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();

        if let Some(base) = lower.strip_suffix("iqamah") {
            return PrayerName::from_label(base)?.iqamah();
        }

        match lower.as_str() {
            "fajr" => Some(PrayerName::Fajr),
            "sunrise" | "shuruq" | "shurooq" => Some(PrayerName::Sunrise),
            "dhuhr" | "zuhr" | "duhr" | "zohr" => Some(PrayerName::Dhuhr),
            "asr" => Some(PrayerName::Asr),
            "maghrib" => Some(PrayerName::Maghrib),
            "isha" => Some(PrayerName::Isha),
            _ => None,
        }
    }

    /// The Iqamah entry that follows this prayer, if it has one
    pub fn iqamah(&self) -> Option<PrayerName> {
        match self {
            PrayerName::Fajr => Some(PrayerName::FajrIqamah),
            PrayerName::Dhuhr => Some(PrayerName::DhuhrIqamah),
            PrayerName::Asr => Some(PrayerName::AsrIqamah),
            PrayerName::Maghrib => Some(PrayerName::MaghribIqamah),
            PrayerName::Isha => Some(PrayerName::IshaIqamah),
            _ => None,
        }
    }

    /// The prayer an Iqamah entry follows
    pub fn base(&self) -> Option<PrayerName> {
        match self {
            PrayerName::FajrIqamah => Some(PrayerName::Fajr),
            PrayerName::DhuhrIqamah => Some(PrayerName::Dhuhr),
            PrayerName::AsrIqamah => Some(PrayerName::Asr),
            PrayerName::MaghribIqamah => Some(PrayerName::Maghrib),
            PrayerName::IshaIqamah => Some(PrayerName::Isha),
            _ => None,
        }
    }

    /// Whether this is a derived Iqamah entry rather than a prayer start time
    pub fn is_iqamah(&self) -> bool {
        matches!(
            self,
            PrayerName::FajrIqamah
                | PrayerName::DhuhrIqamah
                | PrayerName::AsrIqamah
                | PrayerName::MaghribIqamah
                | PrayerName::IshaIqamah
        )
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-prayer adjustments in minutes
pub type MinuteOffsets = BTreeMap<PrayerName, i64>;

/// A date in the Islamic lunar calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HijriDate {
    /// Day of the month
    pub day: u8,
    /// Month name (transliterated)
    pub month: String,
    /// Hijri year
    pub year: u32,
}

impl fmt::Display for HijriDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} AH", self.day, self.month, self.year)
    }
}

/// Prayer times for a single calendar date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerSchedule {
    /// The Gregorian date every time in this schedule is anchored to
    pub date: NaiveDate,
    /// Lunar calendar date, when the source provides one
    pub hijri: Option<HijriDate>,
    times: BTreeMap<PrayerName, NaiveTime>,
}

impl PrayerSchedule {
    /// Creates an empty schedule for the given date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            hijri: None,
            times: BTreeMap::new(),
        }
    }

    /// Creates a schedule from `(prayer, time)` pairs
    pub fn with_times<I>(date: NaiveDate, times: I) -> Self
    where
        I: IntoIterator<Item = (PrayerName, NaiveTime)>,
    {
        Self {
            date,
            hijri: None,
            times: times.into_iter().collect(),
        }
    }

    /// Attaches a Hijri date
    pub fn with_hijri(mut self, hijri: Option<HijriDate>) -> Self {
        self.hijri = hijri;
        self
    }

    /// Sets (or replaces) the time for a prayer
    pub fn insert(&mut self, prayer: PrayerName, time: NaiveTime) {
        self.times.insert(prayer, time);
    }

    /// Returns the time of day for a prayer
    pub fn get(&self, prayer: PrayerName) -> Option<NaiveTime> {
        self.times.get(&prayer).copied()
    }

    /// Returns the full timestamp for a prayer
    ///
    /// An Iqamah entry whose clock time is earlier than its prayer's has
    /// crossed midnight and falls on the following day.
    pub fn at(&self, prayer: PrayerName) -> Option<NaiveDateTime> {
        self.get(prayer).map(|time| self.moment(prayer, time))
    }

    fn moment(&self, prayer: PrayerName, time: NaiveTime) -> NaiveDateTime {
        let at = self.date.and_time(time);
        match prayer.base().and_then(|base| self.get(base)) {
            Some(base_time) if time < base_time => at + Duration::days(1),
            _ => at,
        }
    }

    /// Iterates entries in canonical order
    pub fn entries(&self) -> impl Iterator<Item = (PrayerName, NaiveTime)> + '_ {
        self.times.iter().map(|(name, time)| (*name, *time))
    }

    /// Iterates entries in canonical order as full timestamps, see [`Self::at`]
    pub fn moments(&self) -> impl Iterator<Item = (PrayerName, NaiveDateTime)> + '_ {
        self.entries()
            .map(move |(name, time)| (name, self.moment(name, time)))
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns the obligatory prayers this schedule lacks
    pub fn missing_obligatory(&self) -> Vec<PrayerName> {
        PrayerName::OBLIGATORY
            .into_iter()
            .filter(|prayer| !self.times.contains_key(prayer))
            .collect()
    }

    /// Whether times never decrease in canonical order
    pub fn is_chronological(&self) -> bool {
        let moments: Vec<NaiveDateTime> = self.moments().map(|(_, at)| at).collect();
        moments.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Shifts each listed prayer by its offset in minutes
    ///
    /// Prayers absent from the schedule are ignored. A shift that would leave
    /// the schedule's date is clamped to the first or last minute of the day.
    pub fn apply_offsets(&mut self, offsets: &MinuteOffsets) {
        for (prayer, minutes) in offsets {
            let Some(time) = self.times.get_mut(prayer) else {
                continue;
            };
            let (shifted, overflow) = time.overflowing_add_signed(Duration::minutes(*minutes));
            *time = match overflow.signum() {
                0 => shifted,
                1 => NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(*time),
                _ => NaiveTime::from_hms_opt(0, 0, 0).unwrap_or(*time),
            };
            if overflow != 0 {
                warn!(%prayer, minutes, "offset crosses midnight, clamped to {}", time);
            }
        }
    }

    /// Returns a copy with Iqamah entries derived from per-prayer delays
    ///
    /// Each delay is keyed by the base prayer (e.g. `Fajr: 20` adds
    /// `Fajr Iqamah` twenty minutes after Fajr).
    pub fn with_iqamah(&self, delays: &MinuteOffsets) -> Self {
        let mut schedule = self.clone();
        for (prayer, minutes) in delays {
            let (Some(iqamah), Some(time)) = (prayer.iqamah(), self.get(*prayer)) else {
                continue;
            };
            schedule.insert(iqamah, time + Duration::minutes(*minutes));
        }
        schedule
    }
}
