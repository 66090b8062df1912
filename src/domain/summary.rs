//! Summary statistics derived from a finished portfolio series.
//!
//! Operates on the valued output only, never on the ledger.

use chrono::NaiveDate;

use super::valuation::PortfolioRecord;

/// Headline figures over the TOTAL sub-series.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub end_value_knok: f64,
    pub absolute_change_knok: f64,
    pub percent_change: f64,
    /// TOTAL-only sub-series, ascending by date.
    pub totals_over_time: Vec<(NaiveDate, f64)>,
}

impl Summary {
    fn zero_change(totals_over_time: Vec<(NaiveDate, f64)>) -> Self {
        Summary {
            end_value_knok: 0.0,
            absolute_change_knok: 0.0,
            percent_change: 0.0,
            totals_over_time,
        }
    }
}

/// Summarize the series: end value, absolute and percentage change between
/// the first and last TOTAL.
///
/// Fewer than two totals yields a zero-change summary rather than an error,
/// and a zero first total pins `percent_change` to exactly 0 — a guard
/// against division by zero, not a mathematical identity.
pub fn summarize(series: &[PortfolioRecord]) -> Summary {
    let mut totals: Vec<(NaiveDate, f64)> = series
        .iter()
        .filter(|r| r.is_total())
        .map(|r| (r.date, r.value_knok))
        .collect();
    totals.sort_by_key(|&(date, _)| date);

    if totals.len() < 2 {
        return Summary::zero_change(totals);
    }

    let (_, start_value) = totals[0];
    let (_, end_value) = totals[totals.len() - 1];
    let absolute_change = end_value - start_value;
    let percent_change = if start_value != 0.0 {
        absolute_change / start_value * 100.0
    } else {
        0.0
    };

    Summary {
        end_value_knok: end_value,
        absolute_change_knok: absolute_change,
        percent_change,
        totals_over_time: totals,
    }
}

/// All records at the latest date in the series, sorted descending by value
/// for allocation display. `include_total` keeps or drops the TOTAL row.
pub fn latest_snapshot(series: &[PortfolioRecord], include_total: bool) -> Vec<PortfolioRecord> {
    let Some(latest) = series.iter().map(|r| r.date).max() else {
        return Vec::new();
    };
    let mut snapshot: Vec<PortfolioRecord> = series
        .iter()
        .filter(|r| r.date == latest && (include_total || !r.is_total()))
        .cloned()
        .collect();
    snapshot.sort_by(|a, b| {
        b.value_knok
            .partial_cmp(&a.value_knok)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    snapshot
}
