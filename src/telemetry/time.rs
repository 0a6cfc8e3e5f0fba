//! Timestamp parsing and formatting for sheet date strings.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use super::models::{Cell, Timestamp};

/// Naive date-time layouts seen in the sheet, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y, %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y, %I:%M:%S %p",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y, %H:%M",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses sheet date strings into epoch-millisecond timestamps.
///
/// Strings without an explicit offset are read in `offset`.
#[derive(Debug, Clone, Copy)]
pub struct TimeParser {
    offset: FixedOffset,
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimeParser {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Parser for naive times at `minutes` east of UTC.
    ///
    /// Offsets beyond a day fall back to UTC.
    pub fn with_offset_minutes(minutes: i32) -> Self {
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(offset) => Self { offset },
            None => Self::utc(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse a date string, returning `Timestamp::UNKNOWN` when it cannot be read.
    pub fn parse(&self, input: Option<&str>) -> Timestamp {
        let s = match input.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Timestamp::UNKNOWN,
        };

        self.parse_datetime(s)
            .map(Timestamp::from)
            .unwrap_or(Timestamp::UNKNOWN)
    }

    /// Parse a sheet cell. Numeric cells are taken as epoch milliseconds.
    pub fn parse_cell(&self, cell: &Cell) -> Timestamp {
        match cell {
            Cell::Text(s) => self.parse(Some(s)),
            Cell::Number(n) if n.is_finite() => Timestamp::from_millis(n.trunc() as i64),
            _ => Timestamp::UNKNOWN,
        }
    }

    fn parse_datetime(&self, s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        // "Mon Jan 15 2024 10:30:00 GMT+0530 (India Standard Time)"
        let without_zone_name = s.split(" (").next().unwrap_or(s);
        if let Ok(dt) = DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z") {
            return Some(dt.with_timezone(&Utc));
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.localize(naive);
            }
        }

        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return self.localize(date.and_hms_opt(0, 0, 0)?);
            }
        }

        None
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// `DD/MM/YYYY, HH:MM:SS` in the parser's offset, or `Unknown`.
    pub fn format(&self, ts: Timestamp) -> String {
        match ts.to_datetime() {
            Some(dt) => dt
                .with_timezone(&self.offset)
                .format("%d/%m/%Y, %H:%M:%S")
                .to_string(),
            None => "Unknown".to_string(),
        }
    }

    /// Human relative age of `ts` as seen at `now`.
    ///
    /// Older than a week falls back to the calendar date in the parser's offset.
    pub fn describe_age(&self, ts: Timestamp, now: DateTime<Utc>) -> String {
        let then = match ts.to_datetime() {
            Some(dt) => dt,
            None => return "Unknown".to_string(),
        };

        let seconds = (now - then).num_seconds();
        if seconds < 60 {
            return "Just now".to_string();
        }

        let minutes = seconds / 60;
        if minutes < 60 {
            return format!("{} min{} ago", minutes, plural(minutes));
        }

        let hours = minutes / 60;
        if hours < 24 {
            return format!("{} hour{} ago", hours, plural(hours));
        }

        let days = hours / 24;
        if days < 7 {
            return format!("{} day{} ago", days, plural(days));
        }

        then.with_timezone(&self.offset).format("%d/%m/%Y").to_string()
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
