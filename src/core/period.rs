//! Calendar month arithmetic for reporting periods.
//!
//! A [`YearMonth`] spans from the first day at 00:00:00.000 to the last day at
//! 23:59:59.999, both inclusive. Month lengths come from the Gregorian rules, not
//! a fixed day count.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Gregorian leap-year rule.
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` of `year`; 0 for a month outside 1-12.
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Last instant of `date` (23:59:59.999), the inclusive cut-off for "as of" a day.
///
/// # Errors
/// Returns [`Error::Validation`] if `chrono` cannot represent the instant.
pub fn end_of_day(date: NaiveDate) -> Result<NaiveDateTime> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| Error::validation(format!("No end of day for {date}")))
}

/// A calendar month with precomputed inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl YearMonth {
    /// Builds the period for `year`/`month`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPeriod`] when `month` is not 1-12 or the year is outside
    /// the range `chrono` can represent.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let invalid = || Error::InvalidPeriod { year, month };
        let last_day = days_in_month(year, month);
        if last_day == 0 {
            return Err(invalid());
        }
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .ok_or_else(invalid)?;
        let end = NaiveDate::from_ymd_opt(year, month, last_day)
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .ok_or_else(invalid)?;
        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Result<Self> {
        Self::new(date.year(), date.month())
    }

    /// Calendar year
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Calendar month, 1-12
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First instant of the month (day 1, 00:00:00.000).
    #[must_use]
    pub const fn start(self) -> NaiveDateTime {
        self.start
    }

    /// Last instant of the month (last day, 23:59:59.999), inclusive.
    #[must_use]
    pub const fn end(self) -> NaiveDateTime {
        self.end
    }

    /// Whether `at` falls within `[start, end]`.
    #[must_use]
    pub fn contains(self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }

    /// The following month.
    pub fn next(self) -> Result<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let parse_error = || Error::validation(format!("Expected YYYY-MM, got '{s}'"));
        let (year, month) = s.trim().split_once('-').ok_or_else(parse_error)?;
        let year = year.parse::<i32>().map_err(|_| parse_error())?;
        let month = month.parse::<u32>().map_err(|_| parse_error())?;
        Self::new(year, month)
    }
}
