//! Ledger CSV adapter.
//!
//! Expected header: `date,symbol,quantity,unit_price,currency,note`.
//! A malformed row (bad date, bad number, unknown currency, short record) is
//! fatal to that row only: it is excluded and reported, never folded into
//! holdings with wrong units. An unreadable file is fatal to the run, and so
//! is a ledger whose every row was rejected.

use crate::domain::error::FolioError;
use crate::domain::instrument::Currency;
use crate::domain::transaction::{sort_ledger, Transaction};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct LedgerLoad {
    /// Valid transactions, sorted ascending by date then symbol.
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<SkippedRow>,
}

pub fn load_ledger<P: AsRef<Path>>(path: P) -> Result<LedgerLoad, FolioError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| FolioError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut transactions = Vec::new();
    let mut skipped = Vec::new();

    // Header is line 1.
    for (idx, result) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                skipped.push(SkippedRow {
                    line,
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };
        match parse_row(&record) {
            Ok(tx) => transactions.push(tx),
            Err(reason) => skipped.push(SkippedRow { line, reason }),
        }
    }

    if transactions.is_empty() && !skipped.is_empty() {
        return Err(FolioError::LedgerUnusable {
            file: path.display().to_string(),
            skipped: skipped.len(),
        });
    }

    sort_ledger(&mut transactions);
    Ok(LedgerLoad {
        transactions,
        skipped,
    })
}

fn parse_row(record: &csv::StringRecord) -> Result<Transaction, String> {
    let date_str = record.get(0).ok_or("missing date column")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {date_str:?}: {e}"))?;

    let symbol = record.get(1).ok_or("missing symbol column")?.trim();
    if symbol.is_empty() {
        return Err("empty symbol".into());
    }

    let quantity: f64 = record
        .get(2)
        .ok_or("missing quantity column")?
        .parse()
        .map_err(|e| format!("invalid quantity: {e}"))?;

    let unit_price: f64 = record
        .get(3)
        .ok_or("missing unit_price column")?
        .parse()
        .map_err(|e| format!("invalid unit_price: {e}"))?;

    let currency_str = record.get(4).ok_or("missing currency column")?.trim();
    let currency: Currency = currency_str.parse()?;

    let note = record.get(5).unwrap_or("").to_string();

    Ok(Transaction {
        date,
        symbol: symbol.to_string(),
        quantity,
        unit_price,
        currency: currency.as_str().to_string(),
        note,
    })
}
