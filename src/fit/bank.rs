//! The model bank: fit every candidate on one series, in a fixed order.
//!
//! A model that fails is recorded in `skipped` with its reason and the run
//! continues with the rest.

use crate::domain::{ModelKind, RunConfig, TimeSeries};
use crate::error::AppError;
use crate::fit::arima_search::{ArimaSelection, AutoArimaConfig, auto_arima};
use crate::models::{EtsSpec, FittedModel, MovingAverageSpec, fit_ets, fit_linear_trend, fit_moving_average};

#[derive(Debug, Clone)]
pub struct BankConfig {
    pub ma_window: usize,
    pub seasonal_period: usize,
    pub arima: AutoArimaConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            ma_window: MovingAverageSpec::default().window,
            seasonal_period: crate::domain::MONTHLY,
            arima: AutoArimaConfig::default(),
        }
    }
}

impl BankConfig {
    pub fn from_run(config: &RunConfig) -> Self {
        Self {
            ma_window: config.ma_window,
            seasonal_period: config.seasonal_period,
            arima: AutoArimaConfig {
                period: config.seasonal_period,
                policy: config.search,
                ..AutoArimaConfig::default()
            },
        }
    }
}

/// Output of a bank run.
#[derive(Debug, Clone)]
pub struct BankOutput {
    /// Successful fits, in `ModelKind::ALL` order.
    pub fits: Vec<FittedModel>,
    /// Models that failed and why.
    pub skipped: Vec<(ModelKind, String)>,
    /// Order search details when ARIMA was fitted.
    pub arima: Option<ArimaSelection>,
}

impl BankOutput {
    pub fn get(&self, kind: ModelKind) -> Option<&FittedModel> {
        self.fits.iter().find(|f| f.kind == kind)
    }
}

/// Fit a single model kind. ARIMA runs the automatic order search.
pub fn fit_model(kind: ModelKind, series: &TimeSeries, config: &BankConfig) -> Result<FittedModel, AppError> {
    fit_kind(kind, series, config).map(|(fit, _)| fit)
}

fn fit_kind(
    kind: ModelKind,
    series: &TimeSeries,
    config: &BankConfig,
) -> Result<(FittedModel, Option<ArimaSelection>), AppError> {
    let m = config.seasonal_period;
    let fit = match kind {
        ModelKind::MovingAverage => fit_moving_average(
            series,
            MovingAverageSpec {
                window: config.ma_window,
            },
        )?,
        ModelKind::LinearTrend => fit_linear_trend(series)?,
        ModelKind::EtsSimple => fit_ets(series, EtsSpec::simple())?,
        ModelKind::EtsHolt => fit_ets(series, EtsSpec::holt())?,
        ModelKind::EtsHoltWintersAdditive => fit_ets(series, EtsSpec::holt_winters_additive(m))?,
        ModelKind::EtsHoltWintersMultiplicative => fit_ets(series, EtsSpec::holt_winters_multiplicative(m))?,
        ModelKind::Arima => {
            let selection = auto_arima(series, &config.arima)?;
            return Ok((selection.best.clone(), Some(selection)));
        }
    };
    Ok((fit, None))
}

/// Reason text for a skipped model.
pub(crate) fn skip_reason(err: &AppError) -> String {
    match err {
        AppError::ModelFit { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Fit `kinds` in order; failures are logged and skipped.
pub fn fit_bank(series: &TimeSeries, kinds: &[ModelKind], config: &BankConfig) -> BankOutput {
    let mut fits = Vec::new();
    let mut skipped = Vec::new();
    let mut arima = None;

    for &kind in kinds {
        match fit_kind(kind, series, config) {
            Ok((fit, selection)) => {
                tracing::info!(
                    model = kind.display_name(),
                    spec = %fit.label,
                    aic = ?fit.aic(),
                    bic = ?fit.bic(),
                    "model fitted"
                );
                if selection.is_some() {
                    arima = selection;
                }
                fits.push(fit);
            }
            Err(err) => {
                let reason = skip_reason(&err);
                tracing::warn!(model = kind.display_name(), %reason, "model skipped");
                skipped.push((kind, reason));
            }
        }
    }

    BankOutput { fits, skipped, arima }
}
