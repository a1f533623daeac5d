//! Month-granularity calendar helpers
//!
//! Every date the ledger touches is normalized to the first day of its
//! month. `MonthKey` is the `YYYY-MM` key the reference tables are indexed by.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of this month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Months from `self` to `other` (negative if `other` is earlier)
    pub fn months_until(&self, other: &MonthKey) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + (other.month as i64 - self.month as i64)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned when a string is not a `YYYY-MM` month key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMonthKeyError(pub String);

impl fmt::Display for ParseMonthKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month key '{}'", self.0)
    }
}

impl std::error::Error for ParseMonthKeyError {}

impl FromStr for MonthKey {
    type Err = ParseMonthKeyError;

    /// Accepts `YYYY-MM`, and also a full `YYYY-MM-DD` date (the day is ignored)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseMonthKeyError(s.to_string());

        let mut parts = trimmed.splitn(3, '-');
        let year_part = parts.next().ok_or_else(err)?;
        let month_part = parts.next().ok_or_else(err)?;
        if year_part.len() != 4 || month_part.len() != 2 {
            return Err(err());
        }
        let year: i32 = year_part.parse().map_err(|_| err())?;
        let month: u32 = month_part.parse().map_err(|_| err())?;
        MonthKey::new(year, month).ok_or_else(err)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Normalize a date to day 1 of its month
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Advance a date by one calendar month, saturating at the maximum date
pub fn add_one_month(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX)
}

/// Whole months between the months of `start` and `end`
/// (0 when both fall in the same month, negative when `end` is earlier)
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    MonthKey::from_date(start).months_until(&MonthKey::from_date(end))
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_key_parse_and_display() {
        let key: MonthKey = "2020-03".parse().unwrap();
        assert_eq!(key, MonthKey { year: 2020, month: 3 });
        assert_eq!(key.to_string(), "2020-03");

        let from_date: MonthKey = "2021-11-18".parse().unwrap();
        assert_eq!(from_date.to_string(), "2021-11");

        assert!("2020-13".parse::<MonthKey>().is_err());
        assert!("20-01".parse::<MonthKey>().is_err());
        assert!("NaN-NaN".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_wraps_year() {
        let jan = MonthKey::new(2020, 1).unwrap();
        assert_eq!(jan.previous(), MonthKey::new(2019, 12).unwrap());
        assert_eq!(jan.previous().next(), jan);
        assert_eq!(jan.months_until(&MonthKey::new(2021, 3).unwrap()), 14);
    }

    #[test]
    fn test_month_arithmetic() {
        assert_eq!(first_of_month(date(2020, 2, 29)), date(2020, 2, 1));
        assert_eq!(add_one_month(date(2020, 12, 1)), date(2021, 1, 1));
        assert_eq!(months_between(date(2020, 1, 15), date(2020, 3, 1)), 2);
        assert_eq!(months_between(date(2020, 3, 1), date(2020, 1, 1)), -2);
    }
}
