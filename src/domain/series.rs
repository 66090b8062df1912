//! Sparse date-indexed value series with nearest-prior-date lookup.

use chrono::NaiveDate;

/// Ascending, sparse sequence of `(date, value)` points — closing prices for
/// one symbol, or exchange rates for one currency pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl DateSeries {
    /// Build from points in any order. Duplicate dates keep the last value.
    pub fn from_unsorted(mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|&(date, _)| date);
        points.dedup_by(|later, earlier| {
            if later.0 == earlier.0 {
                earlier.1 = later.1;
                true
            } else {
                false
            }
        });
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Latest value dated at or before `date`. `None` when no prior point
    /// exists — lookups never see a value dated after the query date.
    pub fn at_or_before(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.points.partition_point(|&(d, _)| d <= date);
        idx.checked_sub(1).map(|i| self.points[i].1)
    }

    /// Most recent point in the series.
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|&(d, _)| d)
    }
}
