//! Month partition keys.
//!
//! Every pipeline run is keyed by a calendar month. The key doubles as the
//! name of the remote monthly CSV (`{key}.csv`) and as the suffix of the
//! stored visualisation artifact.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a month string cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseMonthError {
    /// The input is not an ISO `YYYY-MM-DD` or `YYYY-MM` string.
    #[error("invalid month '{0}': expected YYYY-MM-DD or YYYY-MM")]
    Invalid(String),
}

/// Partition key for one calendar month of pipeline execution.
///
/// A `MonthKey` always points at the first day of its month and displays as
/// the ISO date of that day, e.g. `2023-01-01`. Any date within a month parses
/// to the same key, so a trigger firing mid-month still addresses the month's
/// partition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MonthKey(NaiveDate);

impl MonthKey {
    /// Build a key from a calendar year and month (1-12).
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// The key of the month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        // day 1 exists in every month
        Self(date.with_day(1).unwrap_or(date))
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for MonthKey {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::containing(date));
        }
        NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ParseMonthError::Invalid(s.to_string()))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
