//! Append-only store of daily prayer schedules
//!
//! Provides a `CacheStore` that keeps one record per fetch in a flat file in
//! an XDG-compliant cache directory. Nothing is ever rewritten in place for
//! CSV; the JSON array is re-serialized with the new record at the end.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::csv;
use crate::data::aladhan::DayRecord;
use crate::data::PrayerSchedule;

/// Errors that can occur when reading or writing the store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading, creating or appending to the file failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file as a whole cannot be understood
    #[error("Cache file is corrupt: {0}")]
    Corrupt(String),

    /// The record for a date exists but cannot be decoded
    #[error("Malformed cache record for {date}: {reason}")]
    Malformed { date: NaiveDate, reason: String },

    /// Encoding records failed
    #[error("Failed to encode cache: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk layout of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFormat {
    /// `Date,<Prayer1>,<Prayer2>,...` rows
    #[default]
    Csv,
    /// JSON array of API-shaped day records
    Json,
}

impl CacheFormat {
    fn extension(&self) -> &'static str {
        match self {
            CacheFormat::Csv => "csv",
            CacheFormat::Json => "json",
        }
    }
}

/// Turns a city name into a file-name-safe key
pub fn cache_key(city: &str) -> String {
    city.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Reads and appends daily schedules in one flat file
///
/// There is no locking: concurrent invocations may interleave appends.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    format: CacheFormat,
}

impl CacheStore {
    /// Creates a store for `key` inside `dir`
    ///
    /// The file is `prayer_times_<key>.<csv|json>`.
    pub fn new(dir: impl AsRef<Path>, key: &str, format: CacheFormat) -> Self {
        let path = dir
            .as_ref()
            .join(format!("prayer_times_{}.{}", key, format.extension()));
        Self { path, format }
    }

    /// Creates a store backed by an explicit file
    pub fn with_path(path: PathBuf, format: CacheFormat) -> Self {
        Self { path, format }
    }

    /// The XDG cache directory for this application
    ///
    /// Uses `~/.cache/adhan/` on Linux, or the platform equivalent; falls back
    /// to the OS temp directory when no home directory can be determined.
    pub fn default_dir() -> PathBuf {
        ProjectDirs::from("", "", "adhan")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> CacheFormat {
        self.format
    }

    /// Ensures the parent directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    /// Reads the whole file, treating a missing file as empty
    fn read_text(&self) -> Result<String, CacheError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_records(&self) -> Result<Vec<DayRecord>, CacheError> {
        let text = self.read_text()?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    /// Looks up the schedule recorded for `date`
    ///
    /// Every record is scanned; when several exist for the same date, the one
    /// appended last is returned.
    ///
    /// # Returns
    /// * `Ok(Some(schedule))` on a hit
    /// * `Ok(None)` if the file is missing, empty, or has no record for `date`
    /// * `Err(CacheError)` if the file or the matching record cannot be decoded
    pub fn lookup(&self, date: NaiveDate) -> Result<Option<PrayerSchedule>, CacheError> {
        let schedule = match self.format {
            CacheFormat::Csv => csv::lookup(&self.read_text()?, date)?,
            CacheFormat::Json => self
                .read_records()?
                .iter()
                .rev()
                .find(|record| record.gregorian_date() == Some(date))
                .map(|record| {
                    record.to_schedule().map_err(|e| CacheError::Malformed {
                        date,
                        reason: e.to_string(),
                    })
                })
                .transpose()?,
        };

        debug!(path = %self.path.display(), %date, hit = schedule.is_some(), "cache lookup");
        Ok(schedule)
    }

    /// Appends a record for the schedule's date
    ///
    /// Only base prayers are written; derived Iqamah entries are not. An
    /// existing record for the same date is left in place, so the file grows
    /// by one record per call.
    ///
    /// A CSV row is laid out under the store's existing header.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(CacheError)` if the directory or file cannot be written, or if
    ///   an existing store is corrupt (it is not overwritten)
    pub fn append(&self, schedule: &PrayerSchedule) -> Result<(), CacheError> {
        self.ensure_dir()?;

        match self.format {
            CacheFormat::Csv => {
                let text = self.read_text()?;
                let existing = csv::header_line(&text).map(str::to_string);
                let header = existing.clone().unwrap_or_else(csv::header);
                let row = csv::encode_row(schedule, &header)?;

                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                if existing.is_none() {
                    writeln!(file, "{}", header)?;
                } else if !text.ends_with('\n') {
                    writeln!(file)?;
                }
                writeln!(file, "{}", row)?;
            }
            CacheFormat::Json => {
                let mut records = self.read_records()?;
                records.push(DayRecord::from_schedule(schedule));
                fs::write(&self.path, serde_json::to_string_pretty(&records)?)?;
            }
        }

        debug!(path = %self.path.display(), date = %schedule.date, "cache append");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::{sample_schedule, t};
    use crate::data::{HijriDate, PrayerName};
    use tempfile::TempDir;

    fn create_test_store(format: CacheFormat) -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::new(temp_dir.path(), "london", format);
        (store, temp_dir)
    }

    #[test]
    fn test_path_uses_key_and_extension() {
        let (csv_store, temp_dir) = create_test_store(CacheFormat::Csv);
        assert_eq!(csv_store.path(), temp_dir.path().join("prayer_times_london.csv"));

        let json_store = CacheStore::new(temp_dir.path(), "london", CacheFormat::Json);
        assert_eq!(json_store.path(), temp_dir.path().join("prayer_times_london.json"));
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("London"), "london");
        assert_eq!(cache_key(" New York "), "new_york");
        assert_eq!(cache_key("Saint-Denis"), "saint_denis");
    }

    #[test]
    fn test_lookup_missing_file_is_a_miss() {
        for format in [CacheFormat::Csv, CacheFormat::Json] {
            let (store, _temp_dir) = create_test_store(format);
            assert_eq!(store.lookup(sample_schedule().date).unwrap(), None);
            assert!(!store.path().exists(), "Lookup should not create the file");
        }
    }

    #[test]
    fn test_append_then_lookup_round_trip() {
        for format in [CacheFormat::Csv, CacheFormat::Json] {
            let (store, _temp_dir) = create_test_store(format);
            let schedule = sample_schedule();

            store.append(&schedule).expect("Append should succeed");

            let read = store.lookup(schedule.date).unwrap();
            assert_eq!(read, Some(schedule), "Round trip failed for {:?}", format);
        }
    }

    #[test]
    fn test_lookup_other_date_is_a_miss() {
        for format in [CacheFormat::Csv, CacheFormat::Json] {
            let (store, _temp_dir) = create_test_store(format);
            let schedule = sample_schedule();
            store.append(&schedule).unwrap();

            let tomorrow = schedule.date.succ_opt().unwrap();
            assert_eq!(store.lookup(tomorrow).unwrap(), None);
        }
    }

    #[test]
    fn test_duplicate_dates_latest_append_wins() {
        for format in [CacheFormat::Csv, CacheFormat::Json] {
            let (store, _temp_dir) = create_test_store(format);
            let first = sample_schedule();
            let mut second = sample_schedule();
            second.insert(PrayerName::Fajr, t(5, 0));

            store.append(&first).unwrap();
            store.append(&second).unwrap();

            assert_eq!(store.lookup(first.date).unwrap(), Some(second));
        }
    }

    #[test]
    fn test_csv_header_written_once() {
        let (store, _temp_dir) = create_test_store(CacheFormat::Csv);
        let schedule = sample_schedule();
        let mut next_day = sample_schedule();
        next_day.date = schedule.date.succ_opt().unwrap();

        store.append(&schedule).unwrap();
        store.append(&next_day).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date,Fajr,Sunrise,Dhuhr,Asr,Maghrib,Isha",
                "2024-07-15,05:10,06:30,12:15,15:45,18:20,19:50",
                "2024-07-16,05:10,06:30,12:15,15:45,18:20,19:50",
            ]
        );
    }

    #[test]
    fn test_json_store_keeps_hijri_date() {
        let (store, _temp_dir) = create_test_store(CacheFormat::Json);
        let schedule = sample_schedule().with_hijri(Some(HijriDate {
            day: 9,
            month: "Muharram".to_string(),
            year: 1446,
        }));

        store.append(&schedule).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\"gregorian\""));
        assert!(content.contains("\"15-07-2024\""));

        let read = store.lookup(schedule.date).unwrap().unwrap();
        assert_eq!(read.hijri, schedule.hijri);
    }

    #[test]
    fn test_corrupt_json_is_reported_and_preserved() {
        let (store, _temp_dir) = create_test_store(CacheFormat::Json);
        fs::write(store.path(), "[{ not json").unwrap();

        assert!(matches!(
            store.lookup(sample_schedule().date),
            Err(CacheError::Corrupt(_))
        ));
        assert!(matches!(
            store.append(&sample_schedule()),
            Err(CacheError::Corrupt(_))
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[{ not json");
    }

    #[test]
    fn test_csv_append_follows_older_header() {
        let (store, _temp_dir) = create_test_store(CacheFormat::Csv);
        fs::write(
            store.path(),
            "Date,Fajr,Dhuhr,Asr,Maghrib,Isha\n2024-07-14,05:09AM,12:15PM,03:46PM,06:21PM,07:51PM",
        )
        .unwrap();
        let schedule = sample_schedule();

        store.append(&schedule).expect("Append should succeed");

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.ends_with("\n2024-07-15,05:10,12:15,15:45,18:20,19:50\n"));

        let read = store.lookup(schedule.date).unwrap().expect("Should find the row");
        assert_eq!(read.get(PrayerName::Fajr), Some(t(5, 10)));
        assert_eq!(read.get(PrayerName::Dhuhr), Some(t(12, 15)));
        assert_eq!(read.get(PrayerName::Asr), Some(t(15, 45)));
        assert_eq!(read.get(PrayerName::Maghrib), Some(t(18, 20)));
        assert_eq!(read.get(PrayerName::Isha), Some(t(19, 50)));
        assert_eq!(read.get(PrayerName::Sunrise), None);

        let previous = store.lookup(schedule.date.pred_opt().unwrap()).unwrap().unwrap();
        assert_eq!(previous.get(PrayerName::Isha), Some(t(19, 51)));
    }

    #[test]
    fn test_csv_append_refuses_header_without_date() {
        let (store, _temp_dir) = create_test_store(CacheFormat::Csv);
        fs::write(store.path(), "Day,Fajr\n").unwrap();

        assert!(matches!(
            store.append(&sample_schedule()),
            Err(CacheError::Corrupt(_))
        ));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "Day,Fajr\n");
    }

    #[test]
    fn test_append_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let store = CacheStore::new(&nested_path, "london", CacheFormat::Csv);

        store.append(&sample_schedule()).expect("Append should succeed");

        assert!(nested_path.exists(), "Nested directory should be created");
        assert!(store.path().exists(), "Cache file should exist");
    }

    #[test]
    fn test_default_dir_is_xdg_or_temp() {
        let dir = CacheStore::default_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("adhan") || dir == std::env::temp_dir(),
            "Unexpected cache dir {}",
            path_str
        );
    }
}
