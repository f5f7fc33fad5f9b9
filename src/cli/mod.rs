//! Command-line parsing for the monthly forecast comparison.
//!
//! Argument parsing and command dispatch stay separate from the statistics and
//! model code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::SearchPolicy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tf", version, about = "Monthly stock price forecast comparison")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load prices, run the diagnostics, fit every model and compare forecasts.
    Run(RunArgs),
    /// Write a synthetic monthly price CSV (usable with `tf run --input`).
    Sample(SampleArgs),
}

/// Options for a full analysis run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Ticker symbol.
    #[arg(short = 's', long, default_value = "NVDA")]
    pub symbol: String,

    /// First day of the download window (YYYY-MM-DD).
    #[arg(long, default_value = "2015-01-01")]
    pub start: NaiveDate,

    /// End of the download window, exclusive (YYYY-MM-DD).
    #[arg(long, default_value = "2025-01-01")]
    pub end: NaiveDate,

    /// Months held out for the train/test comparison.
    #[arg(long, default_value_t = 30)]
    pub horizon: usize,

    /// Moving-average window.
    #[arg(long, default_value_t = 10)]
    pub ma_window: usize,

    /// Seasonal period for ETS, STL and ARIMA.
    #[arg(long, default_value_t = 12)]
    pub seasonal_period: usize,

    /// ACF/PACF lags (default: 10 * log10(n)).
    #[arg(long)]
    pub lags: Option<usize>,

    /// ARIMA order search.
    #[arg(long, value_enum, default_value_t = SearchPolicy::Stepwise)]
    pub search: SearchPolicy,

    /// Read prices from a CSV file (date + adjusted close) instead of downloading.
    #[arg(long, value_name = "CSV", conflicts_with = "synthetic")]
    pub input: Option<PathBuf>,

    /// Use generated prices instead of downloading (no network).
    #[arg(long)]
    pub synthetic: bool,

    /// Random seed for `--synthetic`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the comparison table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the run summary (table, ARIMA order, hold-out forecasts) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for writing a synthetic price file.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// First month of the sample (YYYY-MM-DD).
    #[arg(long, default_value = "2015-01-01")]
    pub start: NaiveDate,

    /// Number of months to generate.
    #[arg(long, default_value_t = 120)]
    pub months: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Price in the first month.
    #[arg(long, default_value_t = 20.0)]
    pub initial: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["tf", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.symbol, "NVDA");
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(args.horizon, 30);
        assert_eq!(args.ma_window, 10);
        assert_eq!(args.search, SearchPolicy::Stepwise);
        assert!(args.plot && !args.no_plot);
    }

    #[test]
    fn input_conflicts_with_synthetic() {
        let res = Cli::try_parse_from(["tf", "run", "--input", "p.csv", "--synthetic"]);
        assert!(res.is_err());
    }

    #[test]
    fn sample_requires_output() {
        assert!(Cli::try_parse_from(["tf", "sample"]).is_err());
        let cli = Cli::parse_from(["tf", "sample", "--out", "p.csv", "--months", "24"]);
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.months, 24);
        assert_eq!(args.seed, 42);
    }
}
