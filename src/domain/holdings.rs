//! Holdings replay: cumulative quantity (or invested amount) per symbol.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::transaction::Transaction;

/// Per-symbol cumulative holdings. For pooled-fund symbols the value is the
/// running sum of invested NOK, not a unit count.
pub type Holdings = BTreeMap<String, f64>;

/// Holdings as of `date`: sum of `quantity` over every transaction dated at
/// or before it, signed. O(ledger) point query; the valuation engine uses
/// [`HoldingsAccumulator`] instead of calling this per date.
pub fn holdings_as_of(ledger: &[Transaction], date: NaiveDate) -> Holdings {
    let mut holdings = Holdings::new();
    for tx in ledger.iter().filter(|tx| tx.date <= date) {
        *holdings.entry(tx.symbol.clone()).or_insert(0.0) += tx.quantity;
    }
    holdings
}

/// Running holdings over an ascending-date walk. Applies each ledger entry
/// exactly once as its date is reached.
///
/// The ledger must be sorted ascending by date (see
/// [`sort_ledger`](super::transaction::sort_ledger)) and `advance_to` must be
/// called with non-decreasing dates.
#[derive(Debug, Clone)]
pub struct HoldingsAccumulator<'a> {
    ledger: &'a [Transaction],
    next: usize,
    holdings: Holdings,
}

impl<'a> HoldingsAccumulator<'a> {
    pub fn new(ledger: &'a [Transaction]) -> Self {
        Self {
            ledger,
            next: 0,
            holdings: Holdings::new(),
        }
    }

    /// Apply every not-yet-applied transaction dated at or before `date` and
    /// return the holdings as of `date`.
    pub fn advance_to(&mut self, date: NaiveDate) -> &Holdings {
        while let Some(tx) = self.ledger.get(self.next) {
            if tx.date > date {
                break;
            }
            *self.holdings.entry(tx.symbol.clone()).or_insert(0.0) += tx.quantity;
            self.next += 1;
        }
        &self.holdings
    }
}
