//! CSV file quote adapter.
//!
//! One file per external series id under a base directory, named
//! `<series_id>.csv` with header `date,close`. A missing file means the
//! source has no such series, which is distinct from an empty range.

use crate::domain::error::FolioError;
use crate::domain::series::DateSeries;
use crate::ports::quote_port::QuotePort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvQuoteAdapter {
    base_path: PathBuf,
}

impl CsvQuoteAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn series_path(&self, series_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", series_id))
    }

    fn read_points(&self, series_id: &str) -> Result<Option<Vec<(NaiveDate, f64)>>, FolioError> {
        let path = self.series_path(series_id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FolioError::Data {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| FolioError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| FolioError::Data {
                reason: format!("missing date column in {}", path.display()),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                FolioError::Data {
                    reason: format!("invalid date in {}: {}", path.display(), e),
                }
            })?;

            let close: f64 = record
                .get(1)
                .ok_or_else(|| FolioError::Data {
                    reason: format!("missing close column in {}", path.display()),
                })?
                .parse()
                .map_err(|e| FolioError::Data {
                    reason: format!("invalid close value in {}: {}", path.display(), e),
                })?;

            points.push((date, close));
        }

        Ok(Some(points))
    }
}

impl QuotePort for CsvQuoteAdapter {
    fn fetch_closes(
        &self,
        series_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<DateSeries>, FolioError> {
        let Some(mut points) = self.read_points(series_id)? else {
            return Ok(None);
        };
        points.retain(|&(date, _)| date >= start_date && date <= end_date);
        Ok(Some(DateSeries::from_unsorted(points)))
    }

    fn current_quote(&self, series_id: &str) -> Result<Option<(NaiveDate, f64)>, FolioError> {
        let Some(points) = self.read_points(series_id)? else {
            return Ok(None);
        };
        Ok(DateSeries::from_unsorted(points).last())
    }
}
