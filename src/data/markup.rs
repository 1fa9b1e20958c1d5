//! HTML page scraper
//!
//! Finds each prayer's label in the page and reads the first 12-hour time
//! that follows it. The page rounds its times, so a small fixed correction
//! per prayer is applied afterwards.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;

use super::fetcher::{get_text, normalize_time, require_obligatory};
use super::{FetchError, MinuteOffsets, PrayerName, PrayerSchedule};

/// Default page to scrape
const SALAH_COM_URL: &str = "https://salah.com";

/// A time token, possibly split from its meridiem by closing tags
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}:\d{2})\s*(?:<[^>]*>\s*)*([ap]\.?m\.?)")
        .expect("time regex is valid")
});

/// Whole-word, case-insensitive label matcher for each base prayer
static LABEL_RES: LazyLock<[(PrayerName, Regex); 6]> = LazyLock::new(|| {
    PrayerName::BASE.map(|prayer| {
        let label = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(prayer.label())))
            .expect("label regex is valid");
        (prayer, label)
    })
});

/// Minutes added to each scraped prayer unless the city configures its own
pub fn default_corrections() -> MinuteOffsets {
    MinuteOffsets::from([(PrayerName::Fajr, 6), (PrayerName::Maghrib, 3)])
}

/// Client that scrapes prayer times from an HTML page
#[derive(Debug, Clone)]
pub struct MarkupClient {
    client: Client,
    url: String,
    corrections: MinuteOffsets,
}

impl Default for MarkupClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupClient {
    /// Create a new MarkupClient for the default page
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: SALAH_COM_URL.to_string(),
            corrections: default_corrections(),
        }
    }

    /// Scrape a different page
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the per-prayer corrections
    pub fn with_corrections(mut self, corrections: MinuteOffsets) -> Self {
        self.corrections = corrections;
        self
    }

    /// Fetch the page and extract today's schedule
    ///
    /// # Returns
    /// * `Ok(PrayerSchedule)` - Corrected prayer times tagged with `date`
    /// * `Err(FetchError)` - If the request fails or a prayer cannot be found
    pub async fn fetch_schedule(&self, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
        let body = get_text(self.client.get(&self.url)).await?;
        let mut schedule = parse_markup(&body, date)?;
        schedule.apply_offsets(&self.corrections);
        Ok(schedule)
    }
}

/// Extracts uncorrected prayer times from an HTML page
///
/// Sunrise is optional; every obligatory prayer must be present.
pub fn parse_markup(body: &str, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
    let mut schedule = PrayerSchedule::new(date);

    for (prayer, label) in LABEL_RES.iter() {
        let Some(found) = label.find(body) else {
            continue;
        };

        let Some(caps) = TIME_RE.captures(&body[found.end()..]) else {
            continue;
        };

        let token = format!("{} {}", &caps[1], &caps[2]);
        schedule.insert(*prayer, normalize_time(&token)?);
    }

    require_obligatory(&schedule)?;
    Ok(schedule)
}
