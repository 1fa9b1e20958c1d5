//! Dispatch over the upstream prayer time sources
//!
//! Every source issues exactly one GET per call with no retry. Failures of
//! any kind come back as a `FetchError`, which callers treat as "no data".

use chrono::{NaiveDate, NaiveTime};
use reqwest::RequestBuilder;
use thiserror::Error;
use tracing::debug;

use super::{AladhanClient, MarkupClient, PatternClient, PrayerName, PrayerSchedule};
use crate::config::{CityConfig, Config, ConfigError, SourceKind};

/// Errors that can occur when fetching prayer times
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP status {0}")]
    Status(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Upstream reported an error in its payload
    #[error("Upstream reported an error: {0}")]
    ApiError(String),

    /// An obligatory prayer could not be found in the response
    #[error("Missing prayer in response: {0}")]
    MissingPrayer(String),

    /// Invalid time format in response
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

/// One configured upstream source
#[derive(Debug, Clone)]
pub enum Fetcher {
    /// Structured JSON API
    Api(AladhanClient),
    /// HTML page scraped label by label
    Markup(MarkupClient),
    /// JS widget or page matched with a single pattern pass
    Pattern(PatternClient),
}

impl Fetcher {
    /// Builds the fetcher for one city from the loaded configuration
    pub fn from_config(config: &Config, city: &CityConfig) -> Result<Self, ConfigError> {
        let offsets = city.minute_offsets()?;

        let fetcher = match config.source {
            SourceKind::Api => {
                let mut client =
                    AladhanClient::new(city.query_city(), city.country.as_deref().unwrap_or(""))
                        .with_method(config.method)
                        .with_offsets(offsets);
                if let Some(url) = &config.base_url {
                    client = client.with_base_url(url.clone());
                }
                Fetcher::Api(client)
            }
            SourceKind::Markup => {
                let mut client = MarkupClient::new();
                if let Some(url) = &config.base_url {
                    client = client.with_url(url.clone());
                }
                if !offsets.is_empty() {
                    client = client.with_corrections(offsets);
                }
                Fetcher::Markup(client)
            }
            SourceKind::Pattern => {
                let url = config.base_url.clone().ok_or(ConfigError::MissingUrl)?;
                Fetcher::Pattern(PatternClient::new(url).with_offsets(offsets))
            }
        };

        Ok(fetcher)
    }

    /// Fetches the schedule for `date` from the configured source
    pub async fn fetch_schedule(&self, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
        match self {
            Fetcher::Api(client) => client.fetch_schedule(date).await,
            Fetcher::Markup(client) => client.fetch_schedule(date).await,
            Fetcher::Pattern(client) => client.fetch_schedule(date).await,
        }
    }
}

/// Sends a request and returns the body of a successful response
pub(crate) async fn get_text(request: RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    debug!(%status, url = %response.url(), "upstream responded");

    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    Ok(response.text().await?)
}

/// Fails with `MissingPrayer` if any obligatory prayer is absent
pub(crate) fn require_obligatory(schedule: &PrayerSchedule) -> Result<(), FetchError> {
    match schedule.missing_obligatory().first() {
        Some(prayer) => Err(FetchError::MissingPrayer(prayer.to_string())),
        None => Ok(()),
    }
}

/// Normalizes a 12-hour or 24-hour time token to a `NaiveTime`
///
/// Accepts `05:10`, `5:10`, `19:50`, `5:10 AM`, `5:10pm`, `5:10 a.m.` and
/// similar spellings.
pub fn normalize_time(token: &str) -> Result<NaiveTime, FetchError> {
    let invalid = || FetchError::InvalidTimeFormat(token.to_string());

    let cleaned: String = token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_ascii_lowercase();

    let (clock, pm) = if let Some(rest) = cleaned.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = cleaned.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (cleaned.as_str(), None)
    };

    let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
    if minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;

    let hour = match pm {
        Some(pm) if (1..=12).contains(&hour) => hour % 12 + if pm { 12 } else { 0 },
        Some(_) => return Err(invalid()),
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Maps a scraped label to a prayer; every `Isha`-prefixed label is Isha
pub(crate) fn canonical_label(label: &str) -> Option<PrayerName> {
    if label.trim().to_lowercase().starts_with("isha") {
        return Some(PrayerName::Isha);
    }
    PrayerName::from_label(label)
}
