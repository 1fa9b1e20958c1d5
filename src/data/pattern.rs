//! Single-pass pattern extraction for JS widgets and loosely structured pages
//!
//! One regex walks the whole body collecting `(label, time)` pairs. Times may
//! be 12-hour or 24-hour; labels are matched case-insensitively with common
//! transliterations, and every `Isha`-prefixed label counts as Isha.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::fetcher::{canonical_label, get_text, normalize_time, require_obligatory};
use super::{FetchError, MinuteOffsets, PrayerSchedule};

/// A prayer label followed, within a short run of markup or punctuation, by a time
static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b((?:fajr|sunrise|shuruq|shurooq|dhuhr|zuhr|duhr|asr|maghrib)\b|isha\w*(?:\s*\([^)<]*\))?)(?:[^\d<]|<[^>]*>){0,80}?(\d{1,2}:\d{2}(?:\s*[ap]\.?m\.?)?)",
    )
    .expect("pair regex is valid")
});

/// Client for a widget endpoint whose body embeds the day's times
#[derive(Debug, Clone)]
pub struct PatternClient {
    client: Client,
    url: String,
    offsets: MinuteOffsets,
}

impl PatternClient {
    /// Create a new PatternClient for the given widget URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            offsets: MinuteOffsets::new(),
        }
    }

    /// Per-prayer offsets applied after extraction
    pub fn with_offsets(mut self, offsets: MinuteOffsets) -> Self {
        self.offsets = offsets;
        self
    }

    /// Fetch the widget body and extract the schedule for `date`
    pub async fn fetch_schedule(&self, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
        let body = get_text(self.client.get(&self.url)).await?;
        let mut schedule = parse_pattern(&body, date)?;
        schedule.apply_offsets(&self.offsets);
        Ok(schedule)
    }
}

/// Extracts prayer times from any body in one regex pass
///
/// The first occurrence of each prayer wins, so a later "Isha (latest)" does
/// not replace an earlier "Isha".
pub fn parse_pattern(body: &str, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
    let mut schedule = PrayerSchedule::new(date);

    for caps in PAIR_RE.captures_iter(body) {
        let Some(prayer) = canonical_label(&caps[1]) else {
            continue;
        };
        if schedule.get(prayer).is_some() {
            debug!(label = &caps[1], "ignoring repeated label");
            continue;
        }
        schedule.insert(prayer, normalize_time(&caps[2])?);
    }

    require_obligatory(&schedule)?;
    Ok(schedule)
}
