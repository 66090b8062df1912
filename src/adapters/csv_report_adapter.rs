//! CSV output dataset adapter.
//!
//! Persists the valued series as a flat table with columns
//! `Date,Instrument,Quantity,Value_kNOK`, one row per (date, instrument)
//! plus one TOTAL row per date, sorted by Date then Instrument. Column names
//! and the TOTAL sentinel are the contract the presentation layer reads.

use crate::domain::error::FolioError;
use crate::domain::valuation::PortfolioRecord;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use std::path::Path;

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(&self, series: &[PortfolioRecord], output_path: &str) -> Result<(), FolioError> {
        let mut rows: Vec<&PortfolioRecord> = series.iter().collect();
        rows.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.instrument.cmp(&b.instrument))
        });

        let mut wtr = csv::Writer::from_path(output_path).map_err(|e| FolioError::Data {
            reason: format!("failed to open {output_path} for writing: {e}"),
        })?;

        wtr.write_record(["Date", "Instrument", "Quantity", "Value_kNOK"])
            .map_err(write_error)?;
        for record in rows {
            wtr.write_record([
                record.date.format("%Y-%m-%d").to_string(),
                record.instrument.clone(),
                record.quantity.to_string(),
                record.value_knok.to_string(),
            ])
            .map_err(write_error)?;
        }
        wtr.flush().map_err(|e| FolioError::Data {
            reason: format!("failed to flush {output_path}: {e}"),
        })
    }
}

fn write_error(e: csv::Error) -> FolioError {
    FolioError::Data {
        reason: format!("CSV write error: {e}"),
    }
}

/// Read a previously written dataset back, for summary reporting.
pub fn read_series<P: AsRef<Path>>(path: P) -> Result<Vec<PortfolioRecord>, FolioError> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path).map_err(|e| FolioError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut series = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| FolioError::Data {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })?;

        let field = |i: usize, name: &str| -> Result<&str, FolioError> {
            record.get(i).ok_or_else(|| FolioError::Data {
                reason: format!("missing {name} column in {}", path.display()),
            })
        };

        let date = NaiveDate::parse_from_str(field(0, "Date")?, "%Y-%m-%d").map_err(|e| {
            FolioError::Data {
                reason: format!("invalid Date in {}: {}", path.display(), e),
            }
        })?;
        let instrument = field(1, "Instrument")?.to_string();
        let quantity: f64 = field(2, "Quantity")?.parse().map_err(|e| FolioError::Data {
            reason: format!("invalid Quantity in {}: {}", path.display(), e),
        })?;
        let value_knok: f64 = field(3, "Value_kNOK")?
            .parse()
            .map_err(|e| FolioError::Data {
                reason: format!("invalid Value_kNOK in {}: {}", path.display(), e),
            })?;

        series.push(PortfolioRecord {
            date,
            instrument,
            quantity,
            value_knok,
        });
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::valuation::TOTAL;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(d: NaiveDate, instrument: &str, quantity: f64, value: f64) -> PortfolioRecord {
        PortfolioRecord {
            date: d,
            instrument: instrument.to_string(),
            quantity,
            value_knok: value,
        }
    }

    fn sample_series() -> Vec<PortfolioRecord> {
        vec![
            record(date(2024, 1, 2), "KOG", 5.0, 1.5575),
            record(date(2024, 1, 2), "AMD", 9.0, 12.3),
            record(date(2024, 1, 2), TOTAL, 1.0, 13.8575),
            record(date(2024, 1, 1), "AMD", 9.0, 12.0),
            record(date(2024, 1, 1), TOTAL, 1.0, 12.0),
        ]
    }

    #[test]
    fn writes_contract_header_and_sorted_rows() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("portfolio.csv");

        CsvReportAdapter
            .write(&sample_series(), out.to_str().unwrap())
            .unwrap();

        let content = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Date,Instrument,Quantity,Value_kNOK");
        assert!(lines[1].starts_with("2024-01-01,AMD,"));
        assert!(lines[2].starts_with("2024-01-01,TOTAL,1,"));
        assert!(lines[3].starts_with("2024-01-02,AMD,"));
        assert!(lines[4].starts_with("2024-01-02,KOG,"));
        assert!(lines[5].starts_with("2024-01-02,TOTAL,1,"));
    }

    #[test]
    fn round_trips_through_read_series() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("portfolio.csv");

        CsvReportAdapter
            .write(&sample_series(), out.to_str().unwrap())
            .unwrap();
        let read_back = read_series(&out).unwrap();

        assert_eq!(read_back.len(), 5);
        let kog = read_back
            .iter()
            .find(|r| r.instrument == "KOG")
            .unwrap();
        assert_eq!(kog.date, date(2024, 1, 2));
        assert_eq!(kog.quantity, 5.0);
        assert_eq!(kog.value_knok, 1.5575);
    }

    #[test]
    fn read_missing_file_is_fatal() {
        assert!(matches!(
            read_series("/nonexistent/portfolio.csv"),
            Err(FolioError::Data { .. })
        ));
    }

    #[test]
    fn empty_series_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("portfolio.csv");

        CsvReportAdapter.write(&[], out.to_str().unwrap()).unwrap();

        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(content.trim(), "Date,Instrument,Quantity,Value_kNOK");
        assert!(read_series(&out).unwrap().is_empty());
    }
}
