//! Market-data access port trait.

use crate::domain::error::FolioError;
use crate::domain::series::DateSeries;
use chrono::NaiveDate;

/// Source of historical closes and current quotes, keyed by external series
/// id (e.g. `BTC-USD`, `KOG.OL`, `USDNOK=X`).
///
/// `fetch_closes` is one bulk range fetch per series per run; callers must
/// not degrade it into per-date queries. `Ok(None)` means the source knows
/// no such series — distinct from an empty or zero-valued one.
pub trait QuotePort {
    fn fetch_closes(
        &self,
        series_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<DateSeries>, FolioError>;

    /// Latest known close for a series, with its date.
    fn current_quote(&self, series_id: &str) -> Result<Option<(NaiveDate, f64)>, FolioError>;
}
