//! Output dataset port trait.

use crate::domain::error::FolioError;
use crate::domain::valuation::PortfolioRecord;

/// Port for persisting the valued portfolio series.
pub trait ReportPort {
    fn write(&self, series: &[PortfolioRecord], output_path: &str) -> Result<(), FolioError>;
}
