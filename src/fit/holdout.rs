//! Train/test harness.
//!
//! The last `h` observations are held out, the candidate models are refitted
//! on the training prefix only, and their `h`-step forecasts are scored
//! against the held-out values.

use serde::Serialize;

use crate::domain::{EvaluationRow, ModelKind, Split, YearMonth};
use crate::error::AppError;
use crate::fit::bank::{BankConfig, fit_model, skip_reason};
use crate::report::{forecast_rmse, prefer_model};

/// Models refitted on the training window.
pub const HOLDOUT_MODELS: [ModelKind; 2] = [ModelKind::Arima, ModelKind::EtsHoltWintersMultiplicative];

#[derive(Debug, Clone, Serialize)]
pub struct HoldoutResult {
    pub model: ModelKind,
    /// Specification chosen on the training window.
    pub label: String,
    pub forecast: Vec<f64>,
    pub rmse: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldoutOutcome {
    pub train_len: usize,
    pub test_len: usize,
    pub test_start: YearMonth,
    pub results: Vec<HoldoutResult>,
    pub skipped: Vec<(ModelKind, String)>,
    pub preferred: Option<ModelKind>,
}

impl HoldoutOutcome {
    pub fn get(&self, kind: ModelKind) -> Option<&HoldoutResult> {
        self.results.iter().find(|r| r.model == kind)
    }
}

/// Refit `kinds` on the training part of `split` and score their forecasts on the test part.
///
/// `table` is the full-series comparison table, used to break RMSE ties.
pub fn run_holdout(
    split: &Split,
    kinds: &[ModelKind],
    config: &BankConfig,
    table: &[EvaluationRow],
) -> Result<HoldoutOutcome, AppError> {
    let horizon = split.test.len();
    split.check(split.train.len() + horizon)?;

    tracing::info!(
        train = split.train.len(),
        test = horizon,
        test_start = %split.test.start(),
        "hold-out split"
    );

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for &kind in kinds {
        match fit_model(kind, &split.train, config) {
            Ok(fit) => {
                let forecast = fit.forecast(horizon);
                let rmse = forecast_rmse(split.test.values(), &forecast);
                tracing::info!(model = kind.display_name(), spec = %fit.label, rmse = ?rmse, "hold-out forecast");
                results.push(HoldoutResult {
                    model: kind,
                    label: fit.label,
                    forecast,
                    rmse,
                });
            }
            Err(err) => {
                let reason = skip_reason(&err);
                tracing::warn!(model = kind.display_name(), %reason, "hold-out refit failed");
                skipped.push((kind, reason));
            }
        }
    }

    let candidates: Vec<(ModelKind, Option<f64>)> = results.iter().map(|r| (r.model, r.rmse)).collect();
    let preferred = prefer_model(&candidates, table);

    Ok(HoldoutOutcome {
        train_len: split.train.len(),
        test_len: split.test.len(),
        test_start: split.test.start(),
        results,
        skipped,
        preferred,
    })
}
