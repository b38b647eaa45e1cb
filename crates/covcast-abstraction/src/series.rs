//! Date-indexed series types.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// One daily observation or forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// The day this value belongs to.
    pub date: NaiveDate,
    /// Case count for the day.
    pub value: f64,
}

impl SeriesPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A chronologically ordered sequence of daily points.
pub type Series = Vec<SeriesPoint>;

/// An inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates the range `[start, end]`.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidRange` if `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelError> {
        if end < start {
            return Err(ModelError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, both ends included.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// A range always covers at least one day.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterates every day in the range in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// The day after `date`, saturating at the calendar maximum.
    #[must_use]
    pub fn next_day(date: NaiveDate) -> NaiveDate {
        date.checked_add_days(Days::new(1)).unwrap_or(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 1, d).unwrap()
    }

    #[test]
    fn test_range_rejects_reversed_bounds() {
        assert!(matches!(
            DateRange::new(day(10), day(5)),
            Err(ModelError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(day(3), day(3)).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.days().collect::<Vec<_>>(), vec![day(3)]);
    }

    #[test]
    fn test_range_days_are_contiguous() {
        let range = DateRange::new(day(28), NaiveDate::from_ymd_opt(2022, 2, 2).unwrap()).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 6);
        assert_eq!(range.len(), 6);
        for pair in days.windows(2) {
            assert_eq!(DateRange::next_day(pair[0]), pair[1]);
        }
        assert!(range.contains(day(31)));
        assert!(!range.contains(day(27)));
    }
}
