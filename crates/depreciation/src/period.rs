//! Accounting periods (calendar months).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One calendar month. At most one active charge per asset per period.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// The period containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year 0; consecutive periods differ by exactly one.
    pub fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    pub fn is_next_after(&self, other: Period) -> bool {
        self.index() == other.index() + 1
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Default target date for a scheduled run: the last day of the month before `today`.
pub fn last_day_of_previous_month(today: NaiveDate) -> Option<NaiveDate> {
    today.with_day(1)?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_in_same_month_share_a_period() {
        assert_eq!(Period::of(date(2025, 3, 1)), Period::of(date(2025, 3, 31)));
        assert_ne!(Period::of(date(2025, 3, 31)), Period::of(date(2025, 4, 1)));
    }

    #[test]
    fn next_period_crosses_year_boundary() {
        assert!(Period::of(date(2025, 1, 31)).is_next_after(Period::of(date(2024, 12, 31))));
        assert!(!Period::of(date(2025, 2, 28)).is_next_after(Period::of(date(2024, 12, 31))));
    }

    #[test]
    fn previous_month_end() {
        assert_eq!(last_day_of_previous_month(date(2025, 3, 15)), Some(date(2025, 2, 28)));
        assert_eq!(last_day_of_previous_month(date(2025, 1, 1)), Some(date(2024, 12, 31)));
    }

    #[test]
    fn displays_as_year_month() {
        assert_eq!(Period::of(date(2025, 7, 9)).to_string(), "2025-07");
    }
}
