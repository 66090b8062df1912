//! Ledger transaction representation.

use chrono::NaiveDate;

/// One buy (or, with negative quantity, disposal) in the ledger.
///
/// For pooled-fund symbols `quantity` is the amount invested in NOK rather
/// than a unit count; the distinction is carried by the instrument kind, not
/// by the transaction itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub symbol: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub currency: String,
    pub note: String,
}

/// Sort a ledger into replay order: ascending by date, then symbol.
pub fn sort_ledger(ledger: &mut [Transaction]) {
    ledger.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
}

/// First and last transaction dates, or `None` for an empty ledger.
pub fn ledger_span(ledger: &[Transaction]) -> Option<(NaiveDate, NaiveDate)> {
    let first = ledger.iter().map(|t| t.date).min()?;
    let last = ledger.iter().map(|t| t.date).max()?;
    Some((first, last))
}
