//! Relative time windows
//!
//! Windows are always anchored to an explicit evaluation instant. Week and
//! year are fixed day counts; month and quarter use calendar-month arithmetic.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ComputeError;

/// Relative time range used to filter interactions before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Quarter => "quarter",
            TimeWindow::Year => "year",
        }
    }

    /// Earliest instant included in the window ending at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ComputeError> {
        let cutoff = match self {
            TimeWindow::Week => now.checked_sub_signed(Duration::days(7)),
            TimeWindow::Month => now.checked_sub_months(Months::new(1)),
            TimeWindow::Quarter => now.checked_sub_months(Months::new(3)),
            TimeWindow::Year => now.checked_sub_signed(Duration::days(365)),
        };
        cutoff.ok_or_else(|| {
            ComputeError::InvalidWindow(format!("{} before {} is out of range", self, now))
        })
    }

    /// Half-open range `[start, end)` of the window immediately preceding the
    /// one ending at `now`
    pub fn preceding_range(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ComputeError> {
        let end = self.cutoff(now)?;
        let start = self.cutoff(end)?;
        Ok((start, end))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "quarter" => Ok(TimeWindow::Quarter),
            "year" => Ok(TimeWindow::Year),
            other => Err(ComputeError::InvalidWindow(other.to_string())),
        }
    }
}

/// A window bound to the instant it is evaluated at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFilter {
    pub window: TimeWindow,
    pub now: DateTime<Utc>,
}

impl WindowFilter {
    pub fn new(window: TimeWindow, now: DateTime<Utc>) -> Self {
        Self { window, now }
    }

    /// Predicate applied to record timestamps: `created_at >= cutoff`
    pub fn predicate(&self) -> Result<impl Fn(&DateTime<Utc>) -> bool, ComputeError> {
        let cutoff = self.window.cutoff(self.now)?;
        Ok(move |ts: &DateTime<Utc>| *ts >= cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_week_and_year_are_day_counts() {
        let now = at(2024, 3, 10);
        assert_eq!(TimeWindow::Week.cutoff(now).unwrap(), at(2024, 3, 3));
        // 2024 is a leap year, so 365 days back lands on the 11th
        assert_eq!(TimeWindow::Year.cutoff(now).unwrap(), at(2023, 3, 11));
    }

    #[test]
    fn test_month_and_quarter_use_calendar_months() {
        let now = at(2024, 3, 31);
        // February 2024 has 29 days, so the month cutoff clamps to the 29th
        assert_eq!(TimeWindow::Month.cutoff(now).unwrap(), at(2024, 2, 29));
        assert_eq!(TimeWindow::Quarter.cutoff(now).unwrap(), at(2023, 12, 31));
    }

    #[test]
    fn test_preceding_range_is_adjacent() {
        let now = at(2024, 5, 15);
        let (start, end) = TimeWindow::Month.preceding_range(now).unwrap();
        assert_eq!(end, at(2024, 4, 15));
        assert_eq!(start, at(2024, 3, 15));
    }

    #[test]
    fn test_predicate_includes_cutoff_instant() {
        let now = at(2024, 3, 10);
        let filter = WindowFilter::new(TimeWindow::Week, now);
        let keep = filter.predicate().unwrap();
        assert!(keep(&at(2024, 3, 3)));
        assert!(keep(&now));
        assert!(!keep(&at(2024, 3, 2)));
    }

    #[test]
    fn test_parse_window() {
        assert_eq!("Quarter".parse::<TimeWindow>().unwrap(), TimeWindow::Quarter);
        assert!(matches!(
            "fortnight".parse::<TimeWindow>(),
            Err(ComputeError::InvalidWindow(_))
        ));
    }
}
