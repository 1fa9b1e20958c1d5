//! CSV encoding of daily schedules
//!
//! Header `Date,Fajr,Sunrise,Dhuhr,Asr,Maghrib,Isha`, one row per day, dates
//! as `YYYY-MM-DD`, times as 24-hour `HH:MM`, absent prayers as empty cells.
//! Rows are decoded by header name, so files written with a different column
//! set (or 12-hour times) still read back.

use chrono::NaiveDate;
use tracing::warn;

use super::CacheError;
use crate::data::{normalize_time, PrayerName, PrayerSchedule};

/// Format of the `Date` column
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The header line written when a store is created
pub(super) fn header() -> String {
    let mut cells = vec!["Date"];
    cells.extend(PrayerName::BASE.iter().map(|prayer| prayer.label()));
    cells.join(",")
}

/// Encodes the base prayers of a schedule as one row under `header_line`
///
/// Cells follow the existing header's columns, so rows appended to a store
/// written with another column set still decode by name. Prayers without a
/// column are dropped; columns without a prayer get an empty cell.
pub(super) fn encode_row(schedule: &PrayerSchedule, header_line: &str) -> Result<String, CacheError> {
    let columns = split_row(header_line);
    if !columns.iter().any(|column| column.eq_ignore_ascii_case("date")) {
        return Err(CacheError::Corrupt(format!("no Date column in header '{}'", header_line)));
    }

    let cells: Vec<String> = columns
        .iter()
        .map(|column| {
            if column.eq_ignore_ascii_case("date") {
                return schedule.date.format(DATE_FORMAT).to_string();
            }
            PrayerName::from_label(column)
                .and_then(|prayer| schedule.get(prayer))
                .map(|time| time.format("%H:%M").to_string())
                .unwrap_or_default()
        })
        .collect();
    Ok(cells.join(","))
}

/// The first non-blank line of `text`, if any
pub(super) fn header_line(text: &str) -> Option<&str> {
    text.lines().find(|line| !line.trim().is_empty())
}

fn split_row(line: &str) -> Vec<&str> {
    line.trim_end_matches('\r').split(',').map(str::trim).collect()
}

/// Finds the last row for `date` and decodes it
///
/// # Returns
/// * `Ok(Some(schedule))` if a row for `date` exists and decodes
/// * `Ok(None)` if the text is empty or has no row for `date`
/// * `Err(CacheError)` if the header or the matching row is malformed
pub(super) fn lookup(text: &str, date: NaiveDate) -> Result<Option<PrayerSchedule>, CacheError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return Ok(None);
    };
    let columns = split_row(header_line);
    let date_col = columns
        .iter()
        .position(|column| column.eq_ignore_ascii_case("date"))
        .ok_or_else(|| CacheError::Corrupt(format!("no Date column in header '{}'", header_line)))?;

    let mut latest = None;
    for line in lines {
        let cells = split_row(line);
        let Some(cell) = cells.get(date_col) else {
            warn!(row = line, "skipping cache row without a date");
            continue;
        };
        match NaiveDate::parse_from_str(cell, DATE_FORMAT) {
            Ok(row_date) if row_date == date => latest = Some(cells),
            Ok(_) => {}
            Err(_) => warn!(row = line, "skipping cache row with an unreadable date"),
        }
    }

    let Some(cells) = latest else {
        return Ok(None);
    };

    decode_row(&columns, &cells, date).map(Some)
}

fn decode_row(columns: &[&str], cells: &[&str], date: NaiveDate) -> Result<PrayerSchedule, CacheError> {
    let malformed = |reason: String| CacheError::Malformed { date, reason };

    let mut schedule = PrayerSchedule::new(date);
    for (column, cell) in columns.iter().zip(cells) {
        let Some(prayer) = PrayerName::from_label(column) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }
        let time = normalize_time(cell).map_err(|e| malformed(e.to_string()))?;
        schedule.insert(prayer, time);
    }

    if let Some(prayer) = schedule.missing_obligatory().first() {
        return Err(malformed(format!("no time for {}", prayer)));
    }

    Ok(schedule)
}
