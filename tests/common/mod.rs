#![allow(dead_code)]

use chrono::NaiveDate;
use nokfolio::domain::error::FolioError;
use nokfolio::domain::instrument::{parse_kind, InstrumentSet};
use nokfolio::domain::series::DateSeries;
use nokfolio::domain::transaction::{sort_ledger, Transaction};
use nokfolio::ports::quote_port::QuotePort;
use std::collections::HashMap;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn tx(date_str: &str, symbol: &str, quantity: f64) -> Transaction {
    Transaction {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        symbol: symbol.to_string(),
        quantity,
        unit_price: 0.0,
        currency: "NOK".to_string(),
        note: String::new(),
    }
}

pub fn ledger(transactions: Vec<Transaction>) -> Vec<Transaction> {
    let mut ledger = transactions;
    sort_ledger(&mut ledger);
    ledger
}

pub fn instruments(entries: &[(&str, &str)]) -> InstrumentSet {
    entries
        .iter()
        .map(|&(symbol, spec)| (symbol.to_string(), parse_kind(spec).unwrap()))
        .collect()
}

/// Daily constant-valued series of `days` points starting at `start`.
pub fn constant_series(start: NaiveDate, days: i64, value: f64) -> DateSeries {
    DateSeries::from_unsorted(
        (0..days)
            .map(|i| (start + chrono::Duration::days(i), value))
            .collect(),
    )
}

/// In-memory quote source keyed by series id, with per-series error
/// injection.
pub struct MockQuotePort {
    pub data: HashMap<String, Vec<(NaiveDate, f64)>>,
    pub errors: HashMap<String, String>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series_id: &str, points: Vec<(NaiveDate, f64)>) -> Self {
        self.data.insert(series_id.to_string(), points);
        self
    }

    pub fn with_error(mut self, series_id: &str, reason: &str) -> Self {
        self.errors.insert(series_id.to_string(), reason.to_string());
        self
    }
}

impl QuotePort for MockQuotePort {
    fn fetch_closes(
        &self,
        series_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<DateSeries>, FolioError> {
        if let Some(reason) = self.errors.get(series_id) {
            return Err(FolioError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(series_id).map(|points| {
            DateSeries::from_unsorted(
                points
                    .iter()
                    .copied()
                    .filter(|&(d, _)| d >= start_date && d <= end_date)
                    .collect(),
            )
        }))
    }

    fn current_quote(&self, series_id: &str) -> Result<Option<(NaiveDate, f64)>, FolioError> {
        if let Some(reason) = self.errors.get(series_id) {
            return Err(FolioError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(series_id)
            .and_then(|points| DateSeries::from_unsorted(points.clone()).last()))
    }
}
