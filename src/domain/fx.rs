//! Home-currency exchange-rate resolution.

use chrono::NaiveDate;

use super::series::DateSeries;

/// Resolves the USD→NOK rate for a date from a historical series, falling
/// back to a fixed constant so a missing rate never blocks valuation.
#[derive(Debug, Clone)]
pub struct FxConverter {
    series: DateSeries,
    fallback: f64,
}

impl FxConverter {
    pub fn new(series: DateSeries, fallback: f64) -> Self {
        Self { series, fallback }
    }

    /// Converter with no historical data; every lookup yields `fallback`.
    pub fn fallback_only(fallback: f64) -> Self {
        Self::new(DateSeries::default(), fallback)
    }

    /// Nearest-prior rate, never later than `date`. Falls back to the
    /// configured constant when the series has no usable point.
    pub fn rate_on(&self, date: NaiveDate) -> f64 {
        self.series.at_or_before(date).unwrap_or(self.fallback)
    }
}
