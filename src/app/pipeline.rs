//! The analysis pipeline shared by `tf run` and the integration tests.
//!
//! load -> diagnostics (stationarity, correlograms, STL) -> model bank ->
//! comparison table -> residual check -> hold-out refit and preference.
//!
//! The CLI only does presentation on top of [`RunOutput`].

use crate::data::{PriceProvider, PriceRequest, SampleConfig, SampleProvider, YahooClient, load_series};
use crate::domain::{EvaluationRow, ModelKind, PriceObservation, RunConfig, Split, TimeSeries};
use crate::error::AppError;
use crate::fit::{BankConfig, BankOutput, HOLDOUT_MODELS, HoldoutOutcome, fit_bank, run_holdout};
use crate::io::CsvProvider;
use crate::models::ModelState;
use crate::stats::{
    Correlogram, Decomposition, LjungBox, StationarityReport, correlogram, default_max_lag, ljung_box,
    stl_periodic, test_stationarity,
};

/// All computed outputs of a single `tf run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observations: Vec<PriceObservation>,
    pub series: TimeSeries,
    /// First differences of `series`.
    pub differenced: TimeSeries,
    /// `(label, report)` for the raw and differenced series.
    pub stationarity: Vec<(String, StationarityReport)>,
    pub correlograms: Vec<(String, Correlogram)>,
    pub decomposition: Option<Decomposition>,
    pub bank: BankOutput,
    pub table: Vec<EvaluationRow>,
    /// Residual autocorrelation check on the selected ARIMA.
    pub ljung_box: Option<LjungBox>,
    pub holdout: HoldoutOutcome,
}

/// Choose the price source for `config`: CSV file, generated prices or the chart API.
pub fn provider_for(config: &RunConfig) -> Result<Box<dyn PriceProvider>, AppError> {
    if let Some(path) = &config.input {
        return Ok(Box::new(CsvProvider::new(path.clone())));
    }
    if let Some(seed) = config.synthetic_seed {
        return Ok(Box::new(SampleProvider {
            config: SampleConfig {
                seed,
                ..SampleConfig::default()
            },
        }));
    }
    Ok(Box::new(YahooClient::from_env()?))
}

/// Load prices from `provider` and run the full analysis.
pub fn run(config: &RunConfig, provider: &dyn PriceProvider) -> Result<RunOutput, AppError> {
    let request = PriceRequest::from_config(config)?;
    let (observations, series) = load_series(provider, &request)?;
    analyze(config, observations, series)
}

/// Run the analysis on an already loaded series.
pub fn analyze(
    config: &RunConfig,
    observations: Vec<PriceObservation>,
    series: TimeSeries,
) -> Result<RunOutput, AppError> {
    // Nothing is fitted if the split is invalid.
    let split = Split::new(&series, config.horizon)?;
    split.check(series.len())?;

    let differenced = series.diff();

    let mut stationarity = Vec::new();
    let mut correlograms = Vec::new();
    for (label, s) in [("raw", &series), ("differenced", &differenced)] {
        match test_stationarity(s.values()) {
            Ok(report) => {
                tracing::info!(
                    series = label,
                    adf_p = report.adf.p_value,
                    kpss_p = report.kpss.p_value,
                    "stationarity tests"
                );
                stationarity.push((label.to_string(), report));
            }
            Err(err) => tracing::warn!(series = label, error = %err, "stationarity tests skipped"),
        }

        let lags = config.lags.unwrap_or_else(|| default_max_lag(s.len()));
        match correlogram(s.values(), lags) {
            Ok(c) => correlograms.push((label.to_string(), c)),
            Err(err) => tracing::warn!(series = label, error = %err, "correlogram skipped"),
        }
    }

    let decomposition = match stl_periodic(series.values(), config.seasonal_period) {
        Ok(d) => {
            tracing::info!(
                period = d.period,
                strength = d.seasonal_strength(),
                "STL decomposition"
            );
            Some(d)
        }
        Err(err) => {
            tracing::warn!(error = %err, "STL decomposition skipped");
            None
        }
    };

    let bank_config = BankConfig::from_run(config);
    let bank = fit_bank(&series, &ModelKind::ALL, &bank_config);
    let table = crate::report::evaluate(series.values(), &bank.fits);

    let ljung_box = arima_residual_check(&bank, series.len(), config.seasonal_period);

    let holdout = run_holdout(&split, &HOLDOUT_MODELS, &bank_config, &table)?;

    Ok(RunOutput {
        observations,
        series,
        differenced,
        stationarity,
        correlograms,
        decomposition,
        bank,
        table,
        ljung_box,
        holdout,
    })
}

/// Ljung-Box on the ARIMA innovations: `min(2m, n/5)` lags when seasonal, else `min(10, n/5)`.
fn arima_residual_check(bank: &BankOutput, n: usize, period: usize) -> Option<LjungBox> {
    let fit = bank.get(ModelKind::Arima)?;
    let ModelState::Arima(state) = &fit.state else {
        return None;
    };
    let spec = &state.spec;
    let lags = if spec.seasonal.is_none() {
        10.min(n / 5)
    } else {
        (2 * period).min(n / 5)
    };
    let fitted = spec.order.p + spec.order.q + spec.seasonal.p + spec.seasonal.q;

    match ljung_box(state.innovations(), lags, fitted) {
        Ok(lb) => Some(lb),
        Err(err) => {
            tracing::warn!(error = %err, "Ljung-Box check skipped");
            None
        }
    }
}
