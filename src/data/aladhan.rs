//! Aladhan prayer times API client
//!
//! Fetches one day's timings by city from an Aladhan-compatible endpoint.
//! The day object in the response is also the record format of the JSON
//! cache, so it is public here.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::fetcher::{get_text, normalize_time, require_obligatory};
use super::{FetchError, HijriDate, MinuteOffsets, PrayerName, PrayerSchedule};

/// Base URL for the Aladhan API
const ALADHAN_BASE_URL: &str = "https://api.aladhan.com/v1";

/// Date format used in request paths and `date.gregorian.date`
pub const GREGORIAN_FORMAT: &str = "%d-%m-%Y";

/// One day of prayer times as the API returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRecord {
    /// Timing strings keyed by label, e.g. `"Fajr": "05:10 (BST)"`
    pub timings: BTreeMap<String, String>,
    /// Calendar metadata
    pub date: DayDate,
}

/// Calendar block of a day record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayDate {
    pub gregorian: GregorianDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hijri: Option<HijriPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GregorianDate {
    /// `DD-MM-YYYY`
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HijriPayload {
    pub day: String,
    pub month: HijriMonth,
    pub year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HijriMonth {
    pub en: String,
}

impl DayRecord {
    /// Builds a record for the base prayers of a schedule
    pub fn from_schedule(schedule: &PrayerSchedule) -> Self {
        let timings = PrayerName::BASE
            .into_iter()
            .filter_map(|prayer| {
                schedule
                    .get(prayer)
                    .map(|time| (prayer.label().to_string(), time.format("%H:%M").to_string()))
            })
            .collect();

        let hijri = schedule.hijri.as_ref().map(|h| HijriPayload {
            day: h.day.to_string(),
            month: HijriMonth { en: h.month.clone() },
            year: h.year.to_string(),
        });

        Self {
            timings,
            date: DayDate {
                gregorian: GregorianDate {
                    date: schedule.date.format(GREGORIAN_FORMAT).to_string(),
                },
                hijri,
            },
        }
    }

    /// The Gregorian date of this record, if it parses
    pub fn gregorian_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date.gregorian.date, GREGORIAN_FORMAT).ok()
    }

    /// Converts the record into a schedule
    ///
    /// Extra timings (Imsak, Midnight, ...) are ignored. A trailing zone
    /// annotation such as `" (BST)"` is stripped before parsing.
    pub fn to_schedule(&self) -> Result<PrayerSchedule, FetchError> {
        let date = self.gregorian_date().ok_or_else(|| {
            FetchError::ApiError(format!("invalid date '{}'", self.date.gregorian.date))
        })?;

        let mut schedule = PrayerSchedule::new(date).with_hijri(self.hijri());

        for prayer in PrayerName::BASE {
            let Some(raw) = self.timings.get(prayer.label()) else {
                continue;
            };
            let token = raw.split_whitespace().next().unwrap_or_default();
            schedule.insert(prayer, normalize_time(token)?);
        }

        require_obligatory(&schedule)?;
        Ok(schedule)
    }

    fn hijri(&self) -> Option<HijriDate> {
        let hijri = self.date.hijri.as_ref()?;
        Some(HijriDate {
            day: hijri.day.parse().ok()?,
            month: hijri.month.en.clone(),
            year: hijri.year.parse().ok()?,
        })
    }
}

/// Top-level API envelope; `data` is a message string on errors
#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: u16,
    #[serde(default)]
    status: String,
    data: serde_json::Value,
}

/// Client for fetching prayer times from the Aladhan API
#[derive(Debug, Clone)]
pub struct AladhanClient {
    client: Client,
    base_url: String,
    city: String,
    country: String,
    method: Option<u8>,
    offsets: MinuteOffsets,
}

impl AladhanClient {
    /// Create a new AladhanClient for a city
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: ALADHAN_BASE_URL.to_string(),
            city: city.into(),
            country: country.into(),
            method: None,
            offsets: MinuteOffsets::new(),
        }
    }

    /// Point the client at another Aladhan-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Calculation method id passed through to the API
    pub fn with_method(mut self, method: Option<u8>) -> Self {
        self.method = method;
        self
    }

    /// Per-prayer offsets applied to the returned timings
    pub fn with_offsets(mut self, offsets: MinuteOffsets) -> Self {
        self.offsets = offsets;
        self
    }

    /// Fetch the timings for `date`
    ///
    /// # Returns
    /// * `Ok(PrayerSchedule)` - Offset-adjusted timings tagged with `date`
    /// * `Err(FetchError)` - If the request, the status, or the payload is bad
    pub async fn fetch_schedule(&self, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
        let url = format!(
            "{}/timingsByCity/{}",
            self.base_url.trim_end_matches('/'),
            date.format(GREGORIAN_FORMAT)
        );

        let mut query = vec![("city", self.city.clone()), ("country", self.country.clone())];
        if let Some(method) = self.method {
            query.push(("method", method.to_string()));
        }

        let text = get_text(self.client.get(&url).query(&query)).await?;
        let response: AladhanResponse = serde_json::from_str(&text)?;
        let mut schedule = self.parse_response(response)?;

        if schedule.date != date {
            warn!(requested = %date, returned = %schedule.date, "upstream returned a different date");
            schedule.date = date;
        }

        schedule.apply_offsets(&self.offsets);
        Ok(schedule)
    }

    /// Parse the API envelope into a schedule
    fn parse_response(&self, response: AladhanResponse) -> Result<PrayerSchedule, FetchError> {
        if response.code != 200 {
            let message = match response.data {
                serde_json::Value::String(message) => message,
                _ => response.status,
            };
            return Err(FetchError::ApiError(message));
        }

        let day: DayRecord = serde_json::from_value(response.data)?;
        day.to_schedule()
    }
}
