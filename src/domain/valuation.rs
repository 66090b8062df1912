//! Valuation engine: replay the ledger across a date range and value every
//! held instrument per date, in kNOK, with a synthesized TOTAL row per date.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::error::FolioError;
use super::fx::FxConverter;
use super::holdings::HoldingsAccumulator;
use super::instrument::{InstrumentKind, InstrumentSet};
use super::series::DateSeries;
use super::transaction::Transaction;

/// Sentinel instrument name for the per-date aggregate row. Downstream
/// consumers filter on it by identity, never by position.
pub const TOTAL: &str = "TOTAL";

/// One valued point: a (date, instrument) pair, value in thousands of NOK.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRecord {
    pub date: NaiveDate,
    pub instrument: String,
    pub quantity: f64,
    pub value_knok: f64,
}

impl PortfolioRecord {
    pub fn is_total(&self) -> bool {
        self.instrument == TOTAL
    }
}

/// Price and FX data for one run: one bulk-fetched close series per symbol
/// plus the home-pair converter. Fetched once, read-only thereafter.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub prices: HashMap<String, DateSeries>,
    pub fx: FxConverter,
}

/// Produced-vs-expected point counts per symbol, so skipped market points
/// are observable instead of silently missing from the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointCounts {
    pub expected: usize,
    pub produced: usize,
}

impl PointCounts {
    pub fn skipped(&self) -> usize {
        self.expected - self.produced
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    counts: BTreeMap<String, PointCounts>,
}

impl Coverage {
    fn expect(&mut self, symbol: &str) {
        self.counts.entry(symbol.to_string()).or_default().expected += 1;
    }

    fn produce(&mut self, symbol: &str) {
        self.counts.entry(symbol.to_string()).or_default().produced += 1;
    }

    pub fn counts(&self) -> &BTreeMap<String, PointCounts> {
        &self.counts
    }

    pub fn total_skipped(&self) -> usize {
        self.counts.values().map(PointCounts::skipped).sum()
    }
}

/// Value of one symbol's holdings on one date, before the kNOK scaling.
/// `Skip` covers both "no price at or before this date" and "defined to
/// have no value yet" (fixed-from before its threshold); only the former
/// counts against market coverage, handled at the call site.
enum PointValue {
    Nok(f64),
    Skip,
}

fn value_point(
    kind: &InstrumentKind,
    quantity: f64,
    date: NaiveDate,
    market: &MarketData,
    symbol: &str,
) -> PointValue {
    match kind {
        InstrumentKind::FixedPerUnit { unit_value } => PointValue::Nok(quantity * unit_value),
        InstrumentKind::FixedFrom { from, value } => {
            if date < *from {
                PointValue::Skip
            } else {
                PointValue::Nok(*value)
            }
        }
        InstrumentKind::Pooled { .. } => {
            PointValue::Nok(quantity * kind.pooled_multiplier(date))
        }
        InstrumentKind::Market { .. } => {
            let price = market
                .prices
                .get(symbol)
                .and_then(|series| series.at_or_before(date));
            match price {
                // A missing price skips the point; recording zero instead
                // would corrupt the date's TOTAL.
                None => PointValue::Skip,
                Some(price) => {
                    let rate = if kind.is_fx_exempt() {
                        1.0
                    } else {
                        market.fx.rate_on(date)
                    };
                    PointValue::Nok(quantity * price * rate)
                }
            }
        }
    }
}

/// Build the valued daily series over the inclusive range `[start, end]`.
///
/// Per date: records for every symbol with holdings > 0 (ascending symbol
/// order), then one TOTAL record summing them — emitted even when every
/// point was skipped, as long as something was held. Dates before the first
/// transaction produce nothing. The ledger must be date-sorted.
pub fn build_series(
    ledger: &[Transaction],
    instruments: &InstrumentSet,
    market: &MarketData,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(Vec<PortfolioRecord>, Coverage), FolioError> {
    let mut records = Vec::new();
    let mut coverage = Coverage::default();
    let mut acc = HoldingsAccumulator::new(ledger);

    let mut date = start;
    while date <= end {
        let holdings = acc.advance_to(date);
        let mut any_held = false;
        let mut total_knok = 0.0;

        for (symbol, &quantity) in holdings {
            if quantity <= 0.0 {
                continue;
            }
            any_held = true;

            let kind = instruments
                .get(symbol)
                .ok_or_else(|| FolioError::UnknownInstrument {
                    symbol: symbol.clone(),
                })?;

            if matches!(kind, InstrumentKind::Market { .. }) {
                coverage.expect(symbol);
            }

            match value_point(kind, quantity, date, market, symbol) {
                PointValue::Skip => continue,
                PointValue::Nok(value_nok) => {
                    if matches!(kind, InstrumentKind::Market { .. }) {
                        coverage.produce(symbol);
                    }
                    let value_knok = value_nok / 1000.0;
                    total_knok += value_knok;
                    records.push(PortfolioRecord {
                        date,
                        instrument: symbol.clone(),
                        quantity,
                        value_knok,
                    });
                }
            }
        }

        if any_held {
            records.push(PortfolioRecord {
                date,
                instrument: TOTAL.to_string(),
                quantity: 1.0,
                value_knok: total_knok,
            });
        }

        date += chrono::Duration::days(1);
    }

    Ok((records, coverage))
}
