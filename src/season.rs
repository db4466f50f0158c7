//! Competitive seasons (1 July to 30 June).

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};

/// First month of a season.
const SEASON_START_MONTH: u32 = 7;

/// A season, named by the year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The season a date belongs to.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= SEASON_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, SEASON_START_MONTH, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year + 1, 6, 30).unwrap_or(NaiveDate::MAX)
    }

    /// Whether `[from, to]` overlaps this season. Open bounds extend forever.
    pub fn intersects(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        from.map_or(true, |from| from <= self.end()) && to.map_or(true, |to| to >= self.start())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_year, self.start_year + 1)
    }
}

/// Whether a batch concerns the running season.
///
/// Decides how an empty batch result is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonScope {
    Current,
    Historical,
}

impl SeasonScope {
    /// Scope of a batch selected by date range, relative to `today`.
    pub fn of_range(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Self {
        if Season::containing(today).intersects(from, to) {
            Self::Current
        } else {
            Self::Historical
        }
    }
}

impl fmt::Display for SeasonScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Historical => f.write_str("historical"),
        }
    }
}
