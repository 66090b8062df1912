//! Instrument kinds and the kind-spec grammar.
//!
//! Every symbol in the ledger is classified exactly once, at config-load
//! time, into one of a closed set of kinds. The valuation engine dispatches
//! on the kind, never on the symbol string.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::error::KindParseError;

/// All values are normalized into this currency.
pub const HOME_CURRENCY: Currency = Currency::Nok;

/// Currencies the ledger and price series may be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Nok,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Nok => "NOK",
            Currency::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOK" => Ok(Currency::Nok),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unknown currency {other}")),
        }
    }
}

/// Valuation rule for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentKind {
    /// Market-priced: holdings × close-on-date, converted to NOK unless the
    /// native currency already is NOK.
    Market {
        series_id: String,
        currency: Currency,
    },
    /// Constant price per unit, no market data.
    FixedPerUnit { unit_value: f64 },
    /// Flat constant once `from` is reached; no value before it.
    FixedFrom { from: NaiveDate, value: f64 },
    /// Holdings are cumulative invested NOK; value is invested × an explicit
    /// growth multiplier (1.0 when no growth policy is configured).
    Pooled {
        annual_return: f64,
        base_date: Option<NaiveDate>,
    },
}

/// Symbol → kind mapping for one run.
pub type InstrumentSet = BTreeMap<String, InstrumentKind>;

const DAYS_PER_YEAR: f64 = 365.25;

impl InstrumentKind {
    /// True when values of this kind need no FX conversion.
    pub fn is_fx_exempt(&self) -> bool {
        match self {
            InstrumentKind::Market { currency, .. } => *currency == HOME_CURRENCY,
            // Non-market kinds are defined in NOK.
            _ => true,
        }
    }

    /// Growth multiplier for pooled holdings on `date`. 1.0 for every other
    /// kind and for pooled instruments without a growth policy.
    pub fn pooled_multiplier(&self, date: NaiveDate) -> f64 {
        match self {
            InstrumentKind::Pooled {
                annual_return,
                base_date: Some(base),
            } if *annual_return != 0.0 => {
                let days = (date - *base).num_days().max(0) as f64;
                (1.0 + annual_return).powf(days / DAYS_PER_YEAR)
            }
            _ => 1.0,
        }
    }
}

/// Parse a kind-spec string from the `[instruments]` config section.
///
/// Grammar, colon-separated:
/// - `market:<series_id>[:<currency>]` (currency defaults to USD)
/// - `fixed:<unit_value>`
/// - `fixed-from:<YYYY-MM-DD>:<value>`
/// - `pooled[:<annual_return>:<YYYY-MM-DD>]`
pub fn parse_kind(input: &str) -> Result<InstrumentKind, KindParseError> {
    let mut parts = Vec::new();
    let mut offset = 0;
    for part in input.split(':') {
        parts.push((part, offset));
        offset += part.len() + 1;
    }

    let (head, _) = parts[0];
    match head {
        "market" => parse_market(&parts),
        "fixed" => parse_fixed(&parts),
        "fixed-from" => parse_fixed_from(&parts),
        "pooled" => parse_pooled(input, &parts),
        _ => Err(KindParseError {
            message: format!("unknown kind {head:?} (expected market, fixed, fixed-from or pooled)"),
            position: 0,
        }),
    }
}

fn parse_market(parts: &[(&str, usize)]) -> Result<InstrumentKind, KindParseError> {
    let (series_id, pos) = expect_part(parts, 1, "series id")?;
    if series_id.is_empty() {
        return Err(KindParseError {
            message: "empty series id".into(),
            position: pos,
        });
    }
    if parts.len() > 3 {
        return Err(KindParseError {
            message: "trailing input after currency".into(),
            position: parts[3].1,
        });
    }
    let currency = match parts.get(2) {
        Some(&(cur, pos)) => cur.parse().map_err(|message| KindParseError {
            message,
            position: pos,
        })?,
        None => Currency::Usd,
    };
    Ok(InstrumentKind::Market {
        series_id: series_id.to_string(),
        currency,
    })
}

fn parse_fixed(parts: &[(&str, usize)]) -> Result<InstrumentKind, KindParseError> {
    let unit_value = expect_number(parts, 1, "unit value")?;
    reject_trailing(parts, 2)?;
    Ok(InstrumentKind::FixedPerUnit { unit_value })
}

fn parse_fixed_from(parts: &[(&str, usize)]) -> Result<InstrumentKind, KindParseError> {
    let from = expect_date(parts, 1)?;
    let value = expect_number(parts, 2, "value")?;
    reject_trailing(parts, 3)?;
    Ok(InstrumentKind::FixedFrom { from, value })
}

fn parse_pooled(
    input: &str,
    parts: &[(&str, usize)],
) -> Result<InstrumentKind, KindParseError> {
    if parts.len() == 1 {
        return Ok(InstrumentKind::Pooled {
            annual_return: 0.0,
            base_date: None,
        });
    }
    let annual_return = expect_number(parts, 1, "annual return")?;
    // A growth rate without a base date would silently anchor growth at an
    // arbitrary point, so the pair is all-or-nothing.
    if parts.len() < 3 {
        return Err(KindParseError {
            message: "growth rate requires a base date".into(),
            position: input.len(),
        });
    }
    let base_date = expect_date(parts, 2)?;
    reject_trailing(parts, 3)?;
    Ok(InstrumentKind::Pooled {
        annual_return,
        base_date: Some(base_date),
    })
}

fn expect_part<'a>(
    parts: &[(&'a str, usize)],
    index: usize,
    what: &str,
) -> Result<(&'a str, usize), KindParseError> {
    parts.get(index).copied().ok_or_else(|| KindParseError {
        message: format!("expected {what}"),
        position: parts.last().map(|&(p, pos)| pos + p.len()).unwrap_or(0),
    })
}

fn expect_number(
    parts: &[(&str, usize)],
    index: usize,
    what: &str,
) -> Result<f64, KindParseError> {
    let (raw, pos) = expect_part(parts, index, what)?;
    raw.parse().map_err(|_| KindParseError {
        message: format!("expected number for {what}, got {raw:?}"),
        position: pos,
    })
}

fn expect_date(
    parts: &[(&str, usize)],
    index: usize,
) -> Result<NaiveDate, KindParseError> {
    let (raw, pos) = expect_part(parts, index, "date")?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| KindParseError {
        message: format!("expected YYYY-MM-DD date, got {raw:?}"),
        position: pos,
    })
}

fn reject_trailing(parts: &[(&str, usize)], from: usize) -> Result<(), KindParseError> {
    if let Some(&(_, pos)) = parts.get(from) {
        return Err(KindParseError {
            message: "trailing input".into(),
            position: pos,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_market_defaults_to_usd() {
        let kind = parse_kind("market:BTC-USD").unwrap();
        assert_eq!(
            kind,
            InstrumentKind::Market {
                series_id: "BTC-USD".into(),
                currency: Currency::Usd,
            }
        );
        assert!(!kind.is_fx_exempt());
    }

    #[test]
    fn parse_market_nok_is_fx_exempt() {
        let kind = parse_kind("market:KOG.OL:NOK").unwrap();
        assert_eq!(
            kind,
            InstrumentKind::Market {
                series_id: "KOG.OL".into(),
                currency: Currency::Nok,
            }
        );
        assert!(kind.is_fx_exempt());
    }

    #[test]
    fn parse_market_rejects_unknown_currency() {
        let err = parse_kind("market:KOG.OL:GBP").unwrap_err();
        assert!(err.message.contains("GBP"));
        assert_eq!(err.position, 14);
    }

    #[test]
    fn parse_fixed() {
        let kind = parse_kind("fixed:27500").unwrap();
        assert_eq!(kind, InstrumentKind::FixedPerUnit { unit_value: 27500.0 });
        assert!(kind.is_fx_exempt());
    }

    #[test]
    fn parse_fixed_rejects_non_number() {
        let err = parse_kind("fixed:abc").unwrap_err();
        assert_eq!(err.position, 6);
    }

    #[test]
    fn parse_fixed_from() {
        let kind = parse_kind("fixed-from:2025-07-06:15000").unwrap();
        assert_eq!(
            kind,
            InstrumentKind::FixedFrom {
                from: date(2025, 7, 6),
                value: 15000.0,
            }
        );
    }

    #[test]
    fn parse_pooled_bare_is_book_value() {
        let kind = parse_kind("pooled").unwrap();
        assert_eq!(
            kind,
            InstrumentKind::Pooled {
                annual_return: 0.0,
                base_date: None,
            }
        );
        assert!((kind.pooled_multiplier(date(2025, 1, 1)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_pooled_with_growth_policy() {
        let kind = parse_kind("pooled:0.08:2024-08-01").unwrap();
        assert_eq!(
            kind,
            InstrumentKind::Pooled {
                annual_return: 0.08,
                base_date: Some(date(2024, 8, 1)),
            }
        );
    }

    #[test]
    fn parse_pooled_rate_without_base_date_is_rejected() {
        let err = parse_kind("pooled:0.08").unwrap_err();
        assert!(err.message.contains("base date"));
    }

    #[test]
    fn parse_unknown_kind() {
        let err = parse_kind("bond:100").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("bond"));
    }

    #[test]
    fn pooled_multiplier_compounds_from_base_date() {
        let kind = parse_kind("pooled:0.08:2024-08-01").unwrap();
        // One 365.25-day year later: exactly one compounding period.
        let one_year = date(2024, 8, 1) + chrono::Duration::days(365);
        let m = kind.pooled_multiplier(one_year);
        assert!((m - 1.08f64.powf(365.0 / 365.25)).abs() < 1e-12);
    }

    #[test]
    fn pooled_multiplier_clamps_before_base_date() {
        let kind = parse_kind("pooled:0.08:2024-08-01").unwrap();
        let m = kind.pooled_multiplier(date(2024, 1, 1));
        assert!((m - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_pooled_multiplier_is_identity() {
        let kind = parse_kind("fixed:27500").unwrap();
        assert!((kind.pooled_multiplier(date(2025, 1, 1)) - 1.0).abs() < f64::EPSILON);
    }
}
