//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that:
//! - sets up logging
//! - parses CLI arguments
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, RunArgs, SampleArgs};
use crate::data::{SampleConfig, generate_prices};
use crate::domain::{ModelKind, RunConfig, YearMonth};
use crate::error::AppError;
use crate::plot::Overlay;

pub mod pipeline;

/// Entry point for the `tf` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // `tf` and `tf --symbol AMD` behave like `tf run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Logs go to stderr so stdout carries only the report. `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let provider = pipeline::provider_for(&config)?;
    let run = pipeline::run(&config, provider.as_ref())?;

    println!("{}", crate::report::format_series_summary(&config.symbol, &run.series));
    for (label, report) in &run.stationarity {
        println!("{}", crate::report::format_stationarity(label, report));
    }
    for (label, correlogram) in &run.correlograms {
        println!("{}", crate::report::format_correlogram(label, correlogram));
    }
    if let Some(stl) = &run.decomposition {
        println!("{}", crate::report::format_decomposition(stl));
    }

    println!("{}", crate::report::format_comparison_table(&run.table));
    if !run.bank.skipped.is_empty() {
        println!("{}", crate::report::format_skipped(&run.bank.skipped));
    }
    if let Some(selection) = &run.bank.arima {
        println!(
            "{}",
            crate::report::format_arima_selection(selection, run.ljung_box.as_ref())
        );
    }
    println!("{}", crate::report::format_holdout(&run.holdout));

    if config.plot {
        let overlays: Vec<Overlay<'_>> = run
            .holdout
            .results
            .iter()
            .map(|r| Overlay {
                marker: marker_for(r.model),
                label: r.model.display_name(),
                start: run.holdout.train_len,
                values: &r.forecast,
            })
            .collect();
        let plot = crate::plot::render_forecast_plot(&run.series, &overlays, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_table {
        crate::io::write_table_csv(path, &run.table)?;
        tracing::info!(path = %path.display(), "comparison table written");
    }
    if let Some(path) = &config.export_json {
        let mut summary = crate::io::RunSummary::new(&config.symbol, &run.series, run.table.clone(), &run.bank.skipped);
        summary.arima_order = run.bank.arima.as_ref().map(|s| s.spec.label());
        summary.holdout = Some((&run.holdout).into());
        crate::io::write_summary_json(path, &summary)?;
        tracing::info!(path = %path.display(), "run summary written");
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        start: YearMonth::from_date(args.start),
        months: args.months,
        seed: args.seed,
        initial: args.initial,
        ..SampleConfig::default()
    };
    let observations = generate_prices(&config)?;
    crate::io::write_sample_csv(&args.out, &observations)?;
    println!(
        "Wrote {} months ({}..{}) to {}",
        observations.len(),
        config.start,
        config.start.offset(observations.len().saturating_sub(1) as i64),
        args.out.display()
    );
    Ok(())
}

fn marker_for(kind: ModelKind) -> char {
    match kind {
        ModelKind::Arima => 'A',
        ModelKind::EtsHoltWintersMultiplicative => 'M',
        ModelKind::EtsHoltWintersAdditive => 'H',
        ModelKind::EtsHolt => 'T',
        ModelKind::EtsSimple => 'S',
        ModelKind::LinearTrend => 'L',
        ModelKind::MovingAverage => 'V',
    }
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        symbol: args.symbol.clone(),
        start: args.start,
        end: args.end,
        horizon: args.horizon,
        ma_window: args.ma_window,
        seasonal_period: args.seasonal_period,
        lags: args.lags,
        search: args.search,
        input: args.input.clone(),
        synthetic_seed: args.synthetic.then_some(args.seed),
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_table: args.export.clone(),
        export_json: args.export_json.clone(),
    }
}

/// Rewrite argv so `tf` defaults to `tf run`.
///
/// Rules:
/// - `tf`                      -> `tf run`
/// - `tf --symbol AMD ...`     -> `tf run --symbol AMD ...`
/// - `tf --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if matches!(arg1.as_str(), "run" | "sample") {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs() {
        assert_eq!(rewrite_args(argv(&["tf"])), argv(&["tf", "run"]));
        assert_eq!(
            rewrite_args(argv(&["tf", "--symbol", "AMD"])),
            argv(&["tf", "run", "--symbol", "AMD"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        assert_eq!(rewrite_args(argv(&["tf", "--help"])), argv(&["tf", "--help"]));
        assert_eq!(
            rewrite_args(argv(&["tf", "sample", "--out", "x.csv"])),
            argv(&["tf", "sample", "--out", "x.csv"])
        );
    }

    #[test]
    fn config_from_args_resolves_flags() {
        let cli = crate::cli::Cli::parse_from(["tf", "run", "--synthetic", "--seed", "7", "--no-plot"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = run_config_from_args(&args);
        assert_eq!(config.synthetic_seed, Some(7));
        assert!(!config.plot);
        assert_eq!(config.horizon, 30);
    }

    #[test]
    fn tracing_subscriber_is_installed() {
        init_tracing();
        assert!(tracing::dispatcher::has_been_set());
    }
}
