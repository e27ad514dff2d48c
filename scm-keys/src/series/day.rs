//! Tolerant calendar day parsing.
//!
//! Both the reference series and the tooltips spell dates in several ways
//! (`"Nov 30 2013 01: +0"`, `"Jan 1 2024"`, RFC 3339, epoch milliseconds...).
//! Every representation is normalised to a UTC calendar day, so the build-time
//! keys and the lookup keys always agree.

use super::TimestampRaw;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use derive_more::{Display, From};

/// Canonical calendar day, displayed as `YYYY-MM-DD`.
#[derive(Debug, Display, From, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DayKey(pub NaiveDate);

impl DayKey {
    /// Derive the UTC calendar day of a raw timestamp, if it parses.
    pub fn from_raw(raw: &TimestampRaw) -> Option<Self> {
        match raw {
            TimestampRaw::Date(time) => Some(Self(time.date_naive())),
            TimestampRaw::EpochMillis(millis) => from_epoch_millis(*millis),
            TimestampRaw::Text(text) => parse_day(text),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

/// Date-time shapes, tried after the UTC marker has been stripped.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M",
];

/// Date-only shapes.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Trailing markers meaning the time is already UTC.
const UTC_MARKERS: &[&str] = &[" UTC", " GMT", "Z"];

/// Parse a textual timestamp into its UTC calendar day.
///
/// Steam reports hourly buckets as `"Nov 30 2013 01: +0"`; the `" +0"` offset
/// is not something a generic parser accepts, so it is rewritten to `" UTC"`
/// first. Text without an offset is read as UTC.
pub fn parse_day(text: &str) -> Option<DayKey> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let rewritten = match trimmed.strip_suffix(" +0") {
        Some(head) => format!("{head} UTC"),
        None => trimmed.to_string(),
    };

    if let Ok(time) = DateTime::parse_from_rfc3339(&rewritten) {
        return Some(DayKey(time.with_timezone(&Utc).date_naive()));
    }
    if let Ok(time) = DateTime::parse_from_rfc2822(&rewritten) {
        return Some(DayKey(time.with_timezone(&Utc).date_naive()));
    }

    let local = UTC_MARKERS
        .iter()
        .find_map(|marker| rewritten.strip_suffix(marker))
        .unwrap_or(&rewritten)
        .trim();

    // "01:" is an hour with an empty minute field
    let local = local.strip_suffix(':').unwrap_or(local).trim_end();

    parse_naive(local).map(DayKey)
}

fn parse_naive(text: &str) -> Option<NaiveDate> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|time| time.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        })
        .or_else(|| parse_hour_bucket(text))
}

/// `"Nov 30 2013 01"` once the trailing colon is gone: a date followed by a
/// bare hour.
fn parse_hour_bucket(text: &str) -> Option<NaiveDate> {
    let (date, hour) = text.rsplit_once(' ')?;
    let hour: u32 = hour.parse().ok()?;
    if hour > 23 {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date.trim_end(), format).ok())
}

fn from_epoch_millis(millis: f64) -> Option<DayKey> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64).map(|time| DayKey(time.date_naive()))
}
