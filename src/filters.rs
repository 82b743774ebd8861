use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::MetricsError;
use crate::models::CohortAssignment;

/// Inclusive [start, end] query window. Construction rejects inverted
/// windows before any store query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, MetricsError> {
        if end < start {
            return Err(MetricsError::InvalidWindow { start, end });
        }
        Ok(DateWindow { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Composite "<cohort> - <level>" filter. Cohort names may themselves
/// contain " - ", so the last separator wins, matching the greedy parse the
/// dashboards always applied. Anything without a separator or with an empty
/// side is rejected rather than reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelFilter {
    pub cohort: String,
    pub level: String,
}

impl LevelFilter {
    pub fn parse(raw: &str) -> Result<Self, MetricsError> {
        let invalid = || MetricsError::InvalidLevelFilter {
            raw: raw.to_string(),
        };
        let (cohort, level) = raw.rsplit_once(" - ").ok_or_else(invalid)?;
        if cohort.trim().is_empty() || level.trim().is_empty() {
            return Err(invalid());
        }
        Ok(LevelFilter {
            cohort: cohort.to_string(),
            level: level.to_string(),
        })
    }

    pub fn matches(&self, assignment: &CohortAssignment) -> bool {
        assignment.cohort == self.cohort && assignment.level == self.level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WeekMode {
    /// Saturday-anchored weeks on a shared timeline, comparable across
    /// cohorts.
    Calendar,
    /// Cohort-relative program week numbers, comparable only within one
    /// cohort.
    Program,
}

impl FromStr for WeekMode {
    type Err = MetricsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "calendar" => Ok(WeekMode::Calendar),
            "program" => Ok(WeekMode::Program),
            _ => Err(MetricsError::InvalidWeekMode {
                raw: raw.to_string(),
            }),
        }
    }
}
