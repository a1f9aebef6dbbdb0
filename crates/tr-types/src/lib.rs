#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Timestamp = DateTime<Utc>;
pub type FeedId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Numeric,
    Categorical,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::Categorical => f.write_str("categorical"),
        }
    }
}

/// One reading of a feed: `f64` for numeric signals, `String` for categorical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point<T> {
    feed_id: FeedId,
    instant: Timestamp,
    value: T,
}

impl<T> Point<T> {
    #[must_use]
    pub fn new(feed_id: FeedId, instant: Timestamp, value: T) -> Self {
        Self {
            feed_id,
            instant,
            value,
        }
    }

    #[must_use]
    pub fn feed_id(&self) -> FeedId {
        self.feed_id
    }

    #[must_use]
    pub fn instant(&self) -> Timestamp {
        self.instant
    }

    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid period {input:?}: {reason}")]
    Invalid { input: String, reason: &'static str },
    #[error("period {period} overflows the timestamp range from {from}")]
    Overflow { period: Period, from: Timestamp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl PeriodUnit {
    fn suffix(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "w",
            Self::Month => "M",
            Self::Quarter => "q",
            Self::Year => "y",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        let unit = match suffix {
            "s" | "sec" => Self::Second,
            "m" | "min" => Self::Minute,
            "h" => Self::Hour,
            "d" => Self::Day,
            "w" => Self::Week,
            "M" | "mo" => Self::Month,
            "q" => Self::Quarter,
            "y" => Self::Year,
            _ => return None,
        };
        Some(unit)
    }

    fn seconds(self) -> Option<i64> {
        match self {
            Self::Second => Some(1),
            Self::Minute => Some(60),
            Self::Hour => Some(3_600),
            Self::Day => Some(86_400),
            Self::Week => Some(604_800),
            Self::Month | Self::Quarter | Self::Year => None,
        }
    }

    fn months(self) -> Option<u32> {
        match self {
            Self::Month => Some(1),
            Self::Quarter => Some(3),
            Self::Year => Some(12),
            _ => None,
        }
    }
}

/// A bucket length: either a fixed wall-clock duration (`7d`, `15m`) or a
/// calendar period (`1M`, `1q`, `1y`) whose length depends on where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    count: u32,
    unit: PeriodUnit,
}

impl Period {
    pub fn new(count: u32, unit: PeriodUnit) -> Result<Self, PeriodError> {
        if count == 0 {
            return Err(PeriodError::Invalid {
                input: format!("0{}", unit.suffix()),
                reason: "count must be at least 1",
            });
        }
        Ok(Self { count, unit })
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn unit(&self) -> PeriodUnit {
        self.unit
    }

    #[must_use]
    pub fn is_calendar(&self) -> bool {
        self.unit.months().is_some()
    }

    /// The exact length of a fixed period; `None` for calendar periods.
    #[must_use]
    pub fn fixed_duration(&self) -> Option<TimeDelta> {
        let seconds = self.unit.seconds()?.checked_mul(i64::from(self.count))?;
        TimeDelta::try_seconds(seconds)
    }

    /// Adds one period to `instant`. Calendar periods move the local date in
    /// `tz`; the day of month clamps to the end of shorter months and a local
    /// time falling in a DST gap moves to the first valid instant after it.
    pub fn advance(&self, instant: Timestamp, tz: Tz) -> Result<Timestamp, PeriodError> {
        let overflow = || PeriodError::Overflow {
            period: *self,
            from: instant,
        };

        if let Some(delta) = self.fixed_duration() {
            return instant.checked_add_signed(delta).ok_or_else(overflow);
        }

        let months = self
            .unit
            .months()
            .and_then(|m| m.checked_mul(self.count))
            .ok_or_else(overflow)?;
        let local = instant.with_timezone(&tz).naive_local();
        let shifted = local
            .checked_add_months(Months::new(months))
            .ok_or_else(overflow)?;

        first_instant_at_or_after(shifted, tz).ok_or_else(overflow)
    }
}

/// Earliest instant whose wall time in `tz` is at or after `local`. Inside a
/// DST gap that is the instant the gap ends.
fn first_instant_at_or_after(local: NaiveDateTime, tz: Tz) -> Option<Timestamp> {
    if let Some(exact) = tz.from_local_datetime(&local).earliest() {
        return Some(exact.with_timezone(&Utc));
    }
    // UTC offsets stay within a day, so wall time at `low` is before `local`
    // and at `high` after it.
    let mut low = local.checked_sub_signed(TimeDelta::days(1))?.and_utc();
    let mut high = local.checked_add_signed(TimeDelta::days(1))?.and_utc();
    while high - low > TimeDelta::nanoseconds(1) {
        let mid = low + (high - low) / 2;
        if mid.with_timezone(&tz).naive_local() < local {
            low = mid;
        } else {
            high = mid;
        }
    }
    Some(high)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, suffix) = trimmed.split_at(split);

        let invalid = |reason| PeriodError::Invalid {
            input: input.to_owned(),
            reason,
        };

        if digits.is_empty() {
            return Err(invalid("missing count"));
        }
        let count = digits
            .parse::<u32>()
            .map_err(|_| invalid("count out of range"))?;
        let unit = PeriodUnit::from_suffix(suffix).ok_or_else(|| invalid("unknown unit"))?;
        if count == 0 {
            return Err(invalid("count must be at least 1"));
        }
        Ok(Self { count, unit })
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

/// Output rows are the half-open buckets `[from + k·period, from + (k+1)·period)`
/// whose start lies before `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDefinition {
    pub from: Timestamp,
    pub to: Timestamp,
    pub period: Period,
}

impl RowDefinition {
    #[must_use]
    pub fn new(from: Timestamp, to: Timestamp, period: Period) -> Self {
        Self { from, to, period }
    }

    /// Bucket start instants, in order.
    pub fn timestamps(&self, tz: Tz) -> Result<Vec<Timestamp>, PeriodError> {
        let mut out = Vec::new();
        let mut cursor = self.from;
        while cursor < self.to {
            out.push(cursor);
            cursor = self.period.advance(cursor, tz)?;
        }
        Ok(out)
    }

    /// Bucket bounds, the last one clipped to `to`.
    pub fn buckets(&self, tz: Tz) -> Result<Vec<(Timestamp, Timestamp)>, PeriodError> {
        let mut out = Vec::new();
        let mut cursor = self.from;
        while cursor < self.to {
            let next = self.period.advance(cursor, tz)?;
            out.push((cursor, next.min(self.to)));
            cursor = next;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    use super::{Period, PeriodError, PeriodUnit, Point, RowDefinition};

    fn utc(y: i32, m: u32, d: u32) -> super::Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().expect("valid date")
    }

    #[test]
    fn period_parses_and_displays_compact_form() {
        let week: Period = "7d".parse().expect("7d");
        assert_eq!(week.count(), 7);
        assert_eq!(week.unit(), PeriodUnit::Day);
        assert!(!week.is_calendar());
        assert_eq!(week.to_string(), "7d");

        let month: Period = " 1M ".parse().expect("1M");
        assert!(month.is_calendar());
        assert_eq!(month.fixed_duration(), None);
        assert_eq!(month.to_string(), "1M");
    }

    #[test]
    fn period_rejects_zero_and_unknown_units() {
        assert!(matches!(
            "0d".parse::<Period>(),
            Err(PeriodError::Invalid { .. })
        ));
        let err = "3x".parse::<Period>().expect_err("unknown unit");
        assert_eq!(err.to_string(), "invalid period \"3x\": unknown unit");
        assert!("d".parse::<Period>().is_err());
    }

    #[test]
    fn calendar_month_clamps_day_of_month() {
        let month = Period::new(1, PeriodUnit::Month).expect("period");
        let next = month.advance(utc(2024, 1, 31), Tz::UTC).expect("advance");
        assert_eq!(next, utc(2024, 2, 29));
    }

    #[test]
    fn calendar_month_follows_local_midnight_across_dst() {
        let rome: Tz = "Europe/Rome".parse().expect("tz");
        let start = rome
            .with_ymd_and_hms(2025, 3, 1, 0, 0, 0)
            .single()
            .expect("local")
            .with_timezone(&Utc);
        let next = Period::new(1, PeriodUnit::Month)
            .expect("period")
            .advance(start, rome)
            .expect("advance");
        assert_eq!(
            next,
            Utc.with_ymd_and_hms(2025, 3, 31, 22, 0, 0)
                .single()
                .expect("utc")
        );
    }

    #[test]
    fn calendar_step_into_a_dst_gap_lands_on_the_gap_end() {
        let rome: Tz = "Europe/Rome".parse().expect("tz");
        // 02:30 on 2025-03-30 does not exist in Rome; clocks jump from 02:00 to 03:00
        let start = rome
            .with_ymd_and_hms(2025, 1, 30, 2, 30, 0)
            .single()
            .expect("local")
            .with_timezone(&Utc);
        let next = Period::new(2, PeriodUnit::Month)
            .expect("period")
            .advance(start, rome)
            .expect("advance");
        assert_eq!(
            next,
            Utc.with_ymd_and_hms(2025, 3, 30, 1, 0, 0)
                .single()
                .expect("utc")
        );
        assert_eq!(
            next.with_timezone(&rome).format("%H:%M").to_string(),
            "03:00"
        );
    }

    #[test]
    fn row_timestamps_exclude_end_as_bucket_start() {
        let rows = RowDefinition::new(utc(2025, 1, 1), utc(2025, 2, 1), "7d".parse().expect("7d"));
        let stamps = rows.timestamps(Tz::UTC).expect("timestamps");
        assert_eq!(
            stamps,
            vec![
                utc(2025, 1, 1),
                utc(2025, 1, 8),
                utc(2025, 1, 15),
                utc(2025, 1, 22),
                utc(2025, 1, 29)
            ]
        );
        let buckets = rows.buckets(Tz::UTC).expect("buckets");
        assert_eq!(buckets.last(), Some(&(utc(2025, 1, 29), utc(2025, 2, 1))));
    }

    #[test]
    fn period_serializes_as_string() {
        let rows = RowDefinition::new(utc(2025, 1, 1), utc(2025, 1, 2), "1h".parse().expect("1h"));
        let json = serde_json::to_string(&rows).expect("serialize");
        assert!(json.contains("\"period\":\"1h\""));
        let back: RowDefinition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, rows);
    }

    #[test]
    fn point_exposes_fields() {
        let point = Point::new(7, utc(2025, 1, 1), 3.5);
        assert_eq!(point.feed_id(), 7);
        assert_eq!(*point.value(), 3.5);
    }
}
