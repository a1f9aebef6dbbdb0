use std::str::FromStr;

use chrono::{Datelike, SecondsFormat, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tr_types::Timestamp;

/// Numeric field of a row timestamp, read in the view's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarField {
    Hour,
    Minute,
    /// ISO weekday, Monday = 1 ... Sunday = 7.
    DayOfWeek,
    DayOfMonth,
    DayOfYear,
    /// ISO 8601 week number.
    Week,
    Month,
    Quarter,
    Year,
}

impl CalendarField {
    #[must_use]
    pub fn value(self, instant: Timestamp, tz: Tz) -> f64 {
        let local = instant.with_timezone(&tz);
        let value = match self {
            Self::Hour => local.hour(),
            Self::Minute => local.minute(),
            Self::DayOfWeek => local.weekday().number_from_monday(),
            Self::DayOfMonth => local.day(),
            Self::DayOfYear => local.ordinal(),
            Self::Week => local.iso_week().week(),
            Self::Month => local.month(),
            Self::Quarter => (local.month() - 1) / 3 + 1,
            Self::Year => return f64::from(local.year()),
        };
        f64::from(value)
    }
}

impl FromStr for CalendarField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.to_ascii_lowercase().as_str() {
            "hour" => Self::Hour,
            "minute" => Self::Minute,
            "dayofweek" | "weekday" => Self::DayOfWeek,
            "day" | "dayofmonth" => Self::DayOfMonth,
            "dayofyear" => Self::DayOfYear,
            "week" => Self::Week,
            "month" => Self::Month,
            "quarter" => Self::Quarter,
            "year" => Self::Year,
            _ => return Err(()),
        };
        Ok(field)
    }
}

/// Text rendering of a row timestamp; columns using one are alphanumeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeFormat {
    /// `2025-01-08`
    Ymd,
    /// `2025-01`
    Ym,
    /// `2025-01-08 13:00`
    Ymdh,
    /// RFC 3339 with the zone offset, e.g. `2025-01-08T13:00:00+01:00`.
    Iso,
}

impl CompositeFormat {
    #[must_use]
    pub fn render(self, instant: Timestamp, tz: Tz) -> String {
        let local = instant.with_timezone(&tz);
        match self {
            Self::Ymd => local.format("%Y-%m-%d").to_string(),
            Self::Ym => local.format("%Y-%m").to_string(),
            Self::Ymdh => local.format("%Y-%m-%d %H:00").to_string(),
            Self::Iso => local.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }
}

impl FromStr for CompositeFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.to_ascii_lowercase().as_str() {
            "ymd" => Self::Ymd,
            "ym" => Self::Ym,
            "ymdh" => Self::Ymdh,
            "iso" => Self::Iso,
            _ => return Err(()),
        };
        Ok(format)
    }
}
