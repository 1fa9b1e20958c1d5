//! Plain-text report of the next prayer and the day's schedule

use chrono::NaiveTime;
use serde::Deserialize;

use crate::data::PrayerSchedule;
use crate::resolver::{NextPrayer, Remaining};

/// How times of day are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ClockStyle {
    #[default]
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "12h")]
    H12,
}

impl ClockStyle {
    pub fn format(&self, time: NaiveTime) -> String {
        match self {
            ClockStyle::H24 => time.format("%H:%M").to_string(),
            ClockStyle::H12 => time.format("%I:%M %p").to_string(),
        }
    }
}

/// `2:45:00`, or `45 mins` under an hour
pub fn format_remaining(remaining: &Remaining) -> String {
    if remaining.hours == 0 {
        format!("{} mins", remaining.minutes)
    } else {
        format!(
            "{}:{:02}:{:02}",
            remaining.hours, remaining.minutes, remaining.seconds
        )
    }
}

/// Renders the full report printed to stdout
pub fn render(schedule: &PrayerSchedule, next: &NextPrayer, clock: ClockStyle) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} in {}", next.name, format_remaining(&next.remaining)));
    if next.wrapped {
        out.push_str(" (tomorrow)");
    }
    out.push_str("\n\n");

    out.push_str(&schedule.date.format("%A %-d %B %Y").to_string());
    if let Some(hijri) = &schedule.hijri {
        out.push_str(&format!(" / {}", hijri));
    }
    out.push('\n');

    for (name, time) in schedule.entries() {
        let marker = if name == next.name { '>' } else { ' ' };
        out.push_str(&format!("{} {:<16}{}\n", marker, name.label(), clock.format(time)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::{sample_schedule, t};
    use crate::data::HijriDate;
    use crate::resolver::next_prayer;

    #[test]
    fn test_format_remaining() {
        let long = Remaining {
            hours: 2,
            minutes: 5,
            seconds: 9,
        };
        assert_eq!(format_remaining(&long), "2:05:09");

        let short = Remaining {
            hours: 0,
            minutes: 45,
            seconds: 30,
        };
        assert_eq!(format_remaining(&short), "45 mins");
    }

    #[test]
    fn test_clock_styles() {
        assert_eq!(ClockStyle::H24.format(t(19, 50)), "19:50");
        assert_eq!(ClockStyle::H12.format(t(19, 50)), "07:50 PM");
        assert_eq!(ClockStyle::default(), ClockStyle::H24);
    }

    #[test]
    fn test_clock_style_deserializes() {
        let style: ClockStyle = serde_json::from_str("\"12h\"").unwrap();
        assert_eq!(style, ClockStyle::H12);
    }

    #[test]
    fn test_render_marks_next_prayer() {
        let schedule = sample_schedule().with_hijri(Some(HijriDate {
            day: 9,
            month: "Muharram".to_string(),
            year: 1446,
        }));
        let now = schedule.date.and_time(t(13, 0));
        let next = next_prayer(&schedule, now).unwrap();

        let report = render(&schedule, &next, ClockStyle::H24);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Asr in 2:45:00");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Monday 15 July 2024 / 9 Muharram 1446 AH");
        assert_eq!(lines[3], "  Fajr            05:10");
        assert_eq!(lines[6], "> Asr             15:45");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_render_wrapped_next_prayer() {
        let schedule = sample_schedule();
        let next = next_prayer(&schedule, schedule.date.and_time(t(20, 30))).unwrap();

        let report = render(&schedule, &next, ClockStyle::H12);
        assert!(report.starts_with("Fajr in 8:40:00 (tomorrow)\n"));
        assert!(report.contains("> Fajr            05:10 AM"));
    }

    #[test]
    fn test_render_full_report_without_hijri() {
        let schedule = sample_schedule();
        let next = next_prayer(&schedule, schedule.date.and_time(t(19, 5))).unwrap();

        let report = render(&schedule, &next, ClockStyle::H24);
        assert_eq!(
            report,
            "Isha in 45 mins\n\
             \n\
             Monday 15 July 2024\n  \
             Fajr            05:10\n  \
             Sunrise         06:30\n  \
             Dhuhr           12:15\n  \
             Asr             15:45\n  \
             Maghrib         18:20\n\
             > Isha            19:50\n"
        );
    }
}
