//! Straight-line trend: OLS of the series on the time index `1..=n`.

use nalgebra::{DMatrix, DVector};

use crate::domain::{ModelKind, TimeSeries};
use crate::error::AppError;
use crate::math::solve_least_squares;
use crate::models::model::{FittedModel, ModelState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub intercept: f64,
    pub slope: f64,
    /// Number of observations the line was fitted on.
    pub n: usize,
}

impl LinearTrend {
    pub fn value_at(&self, index: usize) -> f64 {
        self.intercept + self.slope * index as f64
    }

    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon).map(|k| self.value_at(self.n + k)).collect()
    }
}

pub fn fit_linear_trend(series: &TimeSeries) -> Result<FittedModel, AppError> {
    let kind = ModelKind::LinearTrend;
    let n = series.len();
    if n < 2 {
        return Err(AppError::model_fit(kind, format!("needs at least 2 observations (n={n})")));
    }

    let x = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { (r + 1) as f64 });
    let y = DVector::from_column_slice(series.values());
    let beta = solve_least_squares(&x, &y)
        .ok_or_else(|| AppError::model_fit(kind, "least squares solve failed"))?;

    let line = LinearTrend {
        intercept: beta[0],
        slope: beta[1],
        n,
    };
    let fitted = (1..=n).map(|i| Some(line.value_at(i))).collect();

    Ok(FittedModel {
        kind,
        label: format!("y = {:.4} + {:.4} t", line.intercept, line.slope),
        fitted,
        criteria: None,
        state: ModelState::LinearTrend(line),
    })
}
