//! Evaluation: RMSE, the comparison table, and terminal formatting.

pub mod format;

pub use format::*;

use std::cmp::Ordering;

use crate::domain::{EvaluationRow, ModelKind};
use crate::models::FittedModel;

/// Root mean squared error over the pairs where both values are defined.
///
/// Returns `None` when no pair is complete.
pub fn rmse(actual: &[f64], predicted: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter_map(|(a, p)| p.map(|p| (a - p).powi(2)))
        .filter(|sq| sq.is_finite())
        .fold((0.0, 0usize), |(s, c), sq| (s + sq, c + 1));
    (count > 0).then(|| (sum / count as f64).sqrt())
}

/// `rmse` for a fully defined forecast.
pub fn forecast_rmse(actual: &[f64], forecast: &[f64]) -> Option<f64> {
    let predicted: Vec<Option<f64>> = forecast.iter().copied().map(Some).collect();
    rmse(actual, &predicted)
}

/// One row per fitted model, in the order given.
pub fn evaluate(actual: &[f64], fits: &[FittedModel]) -> Vec<EvaluationRow> {
    fits.iter()
        .map(|fit| EvaluationRow {
            model: fit.kind,
            rmse: rmse(actual, &fit.fitted),
            aic: fit.aic(),
            bic: fit.bic(),
        })
        .collect()
}

fn cmp_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lowest out-of-sample RMSE wins; ties go to the lower full-series AIC, then BIC.
///
/// Candidates without an RMSE are never preferred.
pub fn prefer_model(candidates: &[(ModelKind, Option<f64>)], table: &[EvaluationRow]) -> Option<ModelKind> {
    let row = |kind: ModelKind| table.iter().find(|r| r.model == kind);
    candidates
        .iter()
        .filter(|(_, rmse)| rmse.is_some())
        .min_by(|(ka, ra), (kb, rb)| {
            cmp_missing_last(*ra, *rb)
                .then_with(|| cmp_missing_last(row(*ka).and_then(|r| r.aic), row(*kb).and_then(|r| r.aic)))
                .then_with(|| cmp_missing_last(row(*ka).and_then(|r| r.bic), row(*kb).and_then(|r| r.bic)))
        })
        .map(|(kind, _)| *kind)
}
