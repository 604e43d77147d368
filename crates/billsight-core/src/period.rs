//! Period resolution for weekly and monthly analyses
//!
//! Maps a reference "today" plus an offset ("N periods ago") to a concrete
//! week or calendar month. Everything here is pure; the reference date comes
//! from an injected [`Clock`] so callers and tests control "today".

use chrono::{Datelike, Days, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Source of the current date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock date in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// How a month offset is turned into a target month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonthStepping {
    /// Step back `30 * offset` days and take that date's month.
    ///
    /// Drifts for long offsets (twelve steps from early March can land in
    /// March of the previous year rather than February).
    #[default]
    Approximate,
    /// Step back exactly `offset` calendar months
    Calendar,
}

impl MonthStepping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approximate => "approximate",
            Self::Calendar => "calendar",
        }
    }
}

impl std::str::FromStr for MonthStepping {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approximate" | "30-day" => Ok(Self::Approximate),
            "calendar" => Ok(Self::Calendar),
            _ => Err(format!(
                "Unknown month stepping: {} (valid: approximate, calendar)",
                s
            )),
        }
    }
}

/// A Monday-aligned week, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekPeriod {
    /// The week containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::Validation(format!("Invalid month: {}", month)));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar month immediately before this one
    pub fn previous(&self) -> Self {
        if self.month > 1 {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        } else {
            Self {
                year: self.year - 1,
                month: 12,
            }
        }
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| self.out_of_range())
    }

    pub fn last_day(&self) -> Result<NaiveDate> {
        self.first_day()?
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> Error {
        Error::Validation(format!("Month out of supported date range: {}", self))
    }

    /// Three-letter month label ("Jan".."Dec")
    pub fn name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }
}

impl std::fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn offset_too_large(offset: u32) -> Error {
    Error::Validation(format!(
        "Offset {} reaches outside the supported date range",
        offset
    ))
}

/// Resolve the week `offset` weeks before the week containing `today`
pub fn week_period(today: NaiveDate, offset: u32) -> Result<WeekPeriod> {
    let current = WeekPeriod::containing(today);
    let start = current
        .start
        .checked_sub_days(Days::new(7 * u64::from(offset)))
        .ok_or_else(|| offset_too_large(offset))?;
    let end = start
        .checked_add_days(Days::new(6))
        .ok_or_else(|| offset_too_large(offset))?;
    Ok(WeekPeriod { start, end })
}

/// Resolve the month `offset` months before the month containing `today`
pub fn month_period(today: NaiveDate, offset: u32, stepping: MonthStepping) -> Result<MonthPeriod> {
    let target = match stepping {
        MonthStepping::Approximate => today.checked_sub_days(Days::new(30 * u64::from(offset))),
        MonthStepping::Calendar => today.checked_sub_months(Months::new(offset)),
    };
    target
        .map(MonthPeriod::containing)
        .ok_or_else(|| offset_too_large(offset))
}

/// Parse a user-supplied period offset ("0", "3", ...)
///
/// Offsets count periods into the past, so negative or non-integer values
/// are rejected.
pub fn parse_offset(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| Error::Validation(format!("Offset must be an integer, got '{}'", raw)))?;
    u32::try_from(value)
        .map_err(|_| Error::Validation(format!("Offset must be zero or positive, got {}", value)))
}
