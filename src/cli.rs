//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_ledger_adapter::{load_ledger, LedgerLoad};
use crate::adapters::csv_quote_adapter::CsvQuoteAdapter;
use crate::adapters::csv_report_adapter::{read_series, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::FolioError;
use crate::domain::fx::FxConverter;
use crate::domain::holdings::holdings_as_of;
use crate::domain::instrument::{parse_kind, InstrumentKind, InstrumentSet};
use crate::domain::summary::{latest_snapshot, summarize};
use crate::domain::transaction::ledger_span;
use crate::domain::valuation::{build_series, Coverage, MarketData};
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "nokfolio", about = "Transaction-replay portfolio valuation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the valued daily series and persist it
    Build {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the range start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Override the range end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    /// Show holdings as of a date
    Holdings {
        #[arg(short, long)]
        config: PathBuf,
        /// Defaults to today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// Summarize a previously built dataset
    Summary {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate configuration and ledger
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Build {
            config,
            output,
            start,
            end,
        } => run_build(&config, output.as_ref(), start.as_deref(), end.as_deref()),
        Command::Holdings { config, date } => run_holdings(&config, date.as_deref()),
        Command::Summary { config } => run_summary(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = FolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Paths, range bounds and FX settings for one run, from `[portfolio]` and
/// `[fx]`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub ledger_path: String,
    pub data_dir: String,
    pub output_path: String,
    pub lead_days: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fx_series_id: String,
    pub fx_fallback_rate: f64,
}

pub fn build_run_config(adapter: &dyn ConfigPort) -> Result<RunConfig, FolioError> {
    let require = |key: &str| -> Result<String, FolioError> {
        adapter
            .get_string("portfolio", key)
            .ok_or_else(|| FolioError::ConfigMissing {
                section: "portfolio".into(),
                key: key.into(),
            })
    };

    let start_date = parse_config_date(adapter, "start_date")?;
    let end_date = parse_config_date(adapter, "end_date")?;

    Ok(RunConfig {
        ledger_path: require("ledger_path")?,
        data_dir: require("data_dir")?,
        output_path: require("output_path")?,
        lead_days: adapter.get_int("portfolio", "lead_days", 30),
        start_date,
        end_date,
        fx_series_id: adapter
            .get_string("fx", "series_id")
            .unwrap_or_else(|| "USDNOK=X".to_string()),
        fx_fallback_rate: adapter.get_double("fx", "fallback_rate", 10.24),
    })
}

fn parse_config_date(
    adapter: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, FolioError> {
    match adapter.get_string("portfolio", key) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map(Some).map_err(|_| {
            FolioError::ConfigInvalid {
                section: "portfolio".into(),
                key: key.into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            }
        }),
    }
}

/// Parse the `[instruments]` section into the closed kind set.
pub fn build_instrument_set(adapter: &dyn ConfigPort) -> Result<InstrumentSet, FolioError> {
    let mut set = InstrumentSet::new();
    for symbol in adapter.keys_in("instruments") {
        let spec = adapter
            .get_string("instruments", &symbol)
            .unwrap_or_default();
        let kind = parse_kind(&spec).map_err(|e| FolioError::ConfigInvalid {
            section: "instruments".into(),
            key: symbol.clone(),
            reason: e.display_with_context(&spec),
        })?;
        set.insert(symbol, kind);
    }
    Ok(set)
}

fn parse_cli_date(raw: &str, what: &str) -> Result<NaiveDate, FolioError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| FolioError::ConfigInvalid {
        section: "cli".into(),
        key: what.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

/// Every ledger symbol must have a kind; a silent default would mis-value a
/// real position.
fn check_ledger_symbols(
    load: &LedgerLoad,
    instruments: &InstrumentSet,
) -> Result<(), FolioError> {
    for tx in &load.transactions {
        if !instruments.contains_key(&tx.symbol) {
            return Err(FolioError::UnknownInstrument {
                symbol: tx.symbol.clone(),
            });
        }
    }
    Ok(())
}

fn report_skipped_rows(load: &LedgerLoad) {
    if !load.skipped.is_empty() {
        eprintln!("Warning: skipped {} malformed ledger row(s):", load.skipped.len());
        for row in &load.skipped {
            eprintln!("  line {}: {}", row.line, row.reason);
        }
    }
}

/// Fetch one close series per market symbol plus the FX series, once for the
/// whole range. A failed or empty fetch degrades to "no data for that
/// symbol" and is reported, never fatal.
pub fn fetch_market_data(
    quotes: &dyn QuotePort,
    instruments: &InstrumentSet,
    fx_series_id: &str,
    fx_fallback_rate: f64,
    start: NaiveDate,
    end: NaiveDate,
) -> MarketData {
    let mut prices = HashMap::new();

    for (symbol, kind) in instruments {
        let InstrumentKind::Market { series_id, .. } = kind else {
            continue;
        };
        match quotes.fetch_closes(series_id, start, end) {
            Ok(Some(series)) => {
                eprintln!("  {}: {} close(s) [OK]", symbol, series.len());
                prices.insert(symbol.clone(), series);
            }
            Ok(None) => {
                eprintln!("Warning: no data source for {symbol} ({series_id})");
            }
            Err(e) => {
                eprintln!("Warning: skipping {symbol} ({series_id}): {e}");
            }
        }
    }

    let fx = match quotes.fetch_closes(fx_series_id, start, end) {
        Ok(Some(series)) if !series.is_empty() => FxConverter::new(series, fx_fallback_rate),
        Ok(_) => {
            eprintln!("Warning: no FX data for {fx_series_id}, using fallback {fx_fallback_rate}");
            FxConverter::fallback_only(fx_fallback_rate)
        }
        Err(e) => {
            eprintln!("Warning: FX fetch failed ({e}), using fallback {fx_fallback_rate}");
            FxConverter::fallback_only(fx_fallback_rate)
        }
    };

    MarketData { prices, fx }
}

fn report_coverage(coverage: &Coverage) {
    if coverage.counts().is_empty() {
        return;
    }
    eprintln!("Coverage:");
    for (symbol, counts) in coverage.counts() {
        if counts.skipped() > 0 {
            eprintln!(
                "  {}: {}/{} points ({} skipped)",
                symbol,
                counts.produced,
                counts.expected,
                counts.skipped()
            );
        } else {
            eprintln!("  {}: {}/{} points", symbol, counts.produced, counts.expected);
        }
    }
}

fn run_build(
    config_path: &PathBuf,
    output_override: Option<&PathBuf>,
    start_override: Option<&str>,
    end_override: Option<&str>,
) -> ExitCode {
    // Stage 1: config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (run_config, instruments) =
        match build_run_config(&adapter).and_then(|rc| Ok((rc, build_instrument_set(&adapter)?))) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    // Stage 2: ledger
    eprintln!("Loading ledger from {}", run_config.ledger_path);
    let load = match load_ledger(&run_config.ledger_path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    report_skipped_rows(&load);
    if let Err(e) = check_ledger_symbols(&load, &instruments) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: date range
    let output_path = output_override
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| run_config.output_path.clone());
    let range = match resolve_range(&run_config, &load, start_override, end_override) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let Some((start, end)) = range else {
        // Nothing to replay: persist an empty dataset rather than failing.
        eprintln!("Ledger is empty; writing empty dataset to {output_path}");
        return match CsvReportAdapter.write(&[], &output_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        };
    };

    // Stage 4: market data, one bulk fetch per symbol
    eprintln!("Fetching market data from {start} to {end}...");
    let quotes = CsvQuoteAdapter::new(PathBuf::from(&run_config.data_dir));
    let market = fetch_market_data(
        &quotes,
        &instruments,
        &run_config.fx_series_id,
        run_config.fx_fallback_rate,
        start,
        end,
    );

    // Stage 5: valuation
    eprintln!("Building series for {} transaction(s)...", load.transactions.len());
    let (series, coverage) = match build_series(&load.transactions, &instruments, &market, start, end)
    {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 6: persist and report
    if let Err(e) = CsvReportAdapter.write(&series, &output_path) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Wrote {} record(s) to {}", series.len(), output_path);
    report_coverage(&coverage);

    ExitCode::SUCCESS
}

type DateRange = Option<(NaiveDate, NaiveDate)>;

/// Resolve the valuation range: overrides, then config, then the ledger span
/// with `lead_days` of history before the first transaction and today as the
/// end. `None` when the ledger is empty and no explicit range exists.
fn resolve_range(
    run_config: &RunConfig,
    load: &LedgerLoad,
    start_override: Option<&str>,
    end_override: Option<&str>,
) -> Result<DateRange, FolioError> {
    let span = ledger_span(&load.transactions);

    let start = match start_override {
        Some(raw) => Some(parse_cli_date(raw, "start")?),
        None => run_config.start_date.or_else(|| {
            span.map(|(first, _)| first - chrono::Duration::days(run_config.lead_days))
        }),
    };
    let end = match end_override {
        Some(raw) => Some(parse_cli_date(raw, "end")?),
        None => run_config
            .end_date
            .or_else(|| span.map(|_| chrono::Local::now().date_naive())),
    };

    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(FolioError::ConfigInvalid {
            section: "portfolio".into(),
            key: "start_date".into(),
            reason: format!("start {start} is after end {end}"),
        }),
        (Some(start), Some(end)) => Ok(Some((start, end))),
        _ => Ok(None),
    }
}

fn run_holdings(config_path: &PathBuf, date_arg: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), FolioError> {
        let run_config = build_run_config(&adapter)?;
        let instruments = build_instrument_set(&adapter)?;
        let date = match date_arg {
            Some(raw) => parse_cli_date(raw, "date")?,
            None => chrono::Local::now().date_naive(),
        };

        let load = load_ledger(&run_config.ledger_path)?;
        report_skipped_rows(&load);
        check_ledger_symbols(&load, &instruments)?;

        let holdings = holdings_as_of(&load.transactions, date);
        if holdings.is_empty() {
            println!("No holdings as of {date}");
            return Ok(());
        }

        let quotes = CsvQuoteAdapter::new(PathBuf::from(&run_config.data_dir));
        println!("Holdings as of {date}:");
        for (symbol, quantity) in &holdings {
            if *quantity <= 0.0 {
                continue;
            }
            let kind = &instruments[symbol];
            match kind {
                InstrumentKind::Market { series_id, currency } => {
                    match quotes.current_quote(series_id)? {
                        Some((quote_date, close)) => {
                            let rate = if kind.is_fx_exempt() {
                                1.0
                            } else {
                                quotes
                                    .current_quote(&run_config.fx_series_id)?
                                    .map(|(_, r)| r)
                                    .unwrap_or(run_config.fx_fallback_rate)
                            };
                            println!(
                                "  {symbol}: {quantity} units, ~{:.0} NOK (close {close} {} on {quote_date})",
                                quantity * close * rate,
                                currency.as_str(),
                            );
                        }
                        None => println!("  {symbol}: {quantity} units (no quote data)"),
                    }
                }
                InstrumentKind::Pooled { .. } => {
                    println!("  {symbol}: {quantity} NOK invested");
                }
                _ => println!("  {symbol}: {quantity} units"),
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_summary(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), FolioError> {
        let run_config = build_run_config(&adapter)?;
        let series = read_series(&run_config.output_path)?;
        let summary = summarize(&series);

        if summary.totals_over_time.is_empty() {
            println!("Dataset {} holds no totals", run_config.output_path);
            return Ok(());
        }

        let (first_date, _) = summary.totals_over_time[0];
        let (last_date, _) = summary.totals_over_time[summary.totals_over_time.len() - 1];
        println!("Portfolio summary ({first_date} to {last_date}):");
        println!("  End value:  {:.1} kNOK", summary.end_value_knok);
        println!(
            "  Change:     {:+.1} kNOK ({:+.1}%)",
            summary.absolute_change_knok, summary.percent_change
        );

        let snapshot = latest_snapshot(&series, false);
        let allocation_base: f64 = snapshot.iter().map(|r| r.value_knok).sum();
        if !snapshot.is_empty() {
            println!("Positions on {last_date}:");
            for record in &snapshot {
                let pct = if allocation_base != 0.0 {
                    record.value_knok / allocation_base * 100.0
                } else {
                    0.0
                };
                println!(
                    "  {}: {:.1} kNOK ({:.1}%)",
                    record.instrument, record.value_knok, pct
                );
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), FolioError> {
        let run_config = build_run_config(&adapter)?;
        let instruments = build_instrument_set(&adapter)?;
        eprintln!("{} instrument(s) configured", instruments.len());
        for (symbol, kind) in &instruments {
            if let InstrumentKind::Pooled { annual_return, .. } = kind {
                eprintln!(
                    "  {symbol}: pooled, {:.1}% assumed annual return",
                    annual_return * 100.0
                );
            }
        }

        let load = load_ledger(&run_config.ledger_path)?;
        report_skipped_rows(&load);
        check_ledger_symbols(&load, &instruments)?;
        eprintln!("{} valid transaction(s)", load.transactions.len());

        println!("OK");
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Currency;

    const SAMPLE: &str = r#"
[portfolio]
ledger_path = data/ledger.csv
data_dir = data/quotes
output_path = data/portfolio.csv

[fx]
fallback_rate = 10.5

[instruments]
AMD = market:AMD
KOG = market:KOG.OL:NOK
KRON_GLOBAL = pooled:0.08:2024-08-01
"#;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn run_config_defaults() {
        let rc = build_run_config(&adapter(SAMPLE)).unwrap();
        assert_eq!(rc.ledger_path, "data/ledger.csv");
        assert_eq!(rc.lead_days, 30);
        assert_eq!(rc.fx_series_id, "USDNOK=X");
        assert_eq!(rc.fx_fallback_rate, 10.5);
        assert_eq!(rc.start_date, None);
    }

    #[test]
    fn run_config_requires_paths() {
        let err = build_run_config(&adapter("[portfolio]\n")).unwrap_err();
        assert!(matches!(err, FolioError::ConfigMissing { .. }));
    }

    #[test]
    fn run_config_rejects_bad_date() {
        let content = "[portfolio]\nledger_path = a\ndata_dir = b\noutput_path = c\nstart_date = 01/01/2024\n";
        let err = build_run_config(&adapter(content)).unwrap_err();
        assert!(matches!(
            err,
            FolioError::ConfigInvalid { ref key, .. } if key == "start_date"
        ));
    }

    #[test]
    fn instrument_set_parses_all_kinds() {
        let set = build_instrument_set(&adapter(SAMPLE)).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(
            set["KOG"],
            InstrumentKind::Market {
                series_id: "KOG.OL".into(),
                currency: Currency::Nok,
            }
        );
    }

    #[test]
    fn instrument_set_rejects_bad_spec_with_context() {
        let content = "[instruments]\nAMD = market\n";
        let err = build_instrument_set(&adapter(content)).unwrap_err();
        let FolioError::ConfigInvalid { key, reason, .. } = err else {
            panic!("expected ConfigInvalid");
        };
        assert_eq!(key, "AMD");
        assert!(reason.contains("expected series id"));
    }
}
