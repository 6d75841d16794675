#![deny(unsafe_code)]

use std::fmt;

use chrono::{Datelike, Days, NaiveDate};

use crate::ModelError;

/// Name of a regulatory extract category (e.g. `BASE_AT12`).
///
/// Stored trimmed and uppercased so lookups never depend on how a
/// filename or schema key happened to be spelled.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Subtype(String);

impl Subtype {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(ModelError::InvalidSubtype(value));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monthly reporting period.
///
/// Accepts `YYYYMM` or `YYYYMMDD` (the day is ignored) and renders as `YYYYMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, ModelError> {
        if !(1..=12).contains(&month) || !(1900..=9999).contains(&year) {
            return Err(ModelError::InvalidPeriod(format!("{year:04}{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let trimmed = value.trim();
        let invalid = || ModelError::InvalidPeriod(value.to_string());
        if !matches!(trimmed.len(), 6 | 8) || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = trimmed[..4].parse().map_err(|_| invalid())?;
        let month: u32 = trimmed[4..6].parse().map_err(|_| invalid())?;
        if trimmed.len() == 8 {
            let day: u32 = trimmed[6..8].parse().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        }
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Constructor guarantees a valid month.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Last calendar day of the month before this period.
    pub fn last_day_of_previous_month(&self) -> NaiveDate {
        let first = self.first_day();
        first.checked_sub_days(Days::new(1)).unwrap_or(first)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Period::parse(&s).map_err(serde::de::Error::custom)
    }
}
