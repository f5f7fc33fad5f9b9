//! The fitted-model value shared by every model family.
//!
//! Fitting functions are pure: they take a series plus a small config struct
//! and return a `FittedModel`. The model keeps just enough state to produce
//! point forecasts; dispatch is a plain `match` on `ModelState`.

use serde::Serialize;

use crate::domain::ModelKind;
use crate::models::arima::ArimaState;
use crate::models::ets::EtsState;
use crate::models::linear::LinearTrend;

/// Likelihood-based criteria. `n_params` includes the innovation variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InformationCriteria {
    pub log_likelihood: f64,
    pub n_params: usize,
    pub n_obs: usize,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
}

impl InformationCriteria {
    pub fn from_log_likelihood(log_likelihood: f64, n_params: usize, n_obs: usize) -> Self {
        let k = n_params as f64;
        let n = n_obs as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let aicc = if n - k - 1.0 > 0.0 {
            aic + 2.0 * k * (k + 1.0) / (n - k - 1.0)
        } else {
            f64::INFINITY
        };
        let bic = -2.0 * log_likelihood + k * n.ln();
        Self {
            log_likelihood,
            n_params,
            n_obs,
            aic,
            aicc,
            bic,
        }
    }
}

/// Gaussian log-likelihood with the variance concentrated out: `-n/2 (ln 2π + ln(SSE/n) + 1)`.
///
/// A perfect fit would give `+inf`; the SSE is floored so criteria stay finite.
pub fn concentrated_log_likelihood(sse: f64, n_obs: usize) -> f64 {
    let n = n_obs as f64;
    let sigma2 = (sse / n).max(1e-300);
    -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0)
}

/// Model-specific state needed to forecast.
#[derive(Debug, Clone)]
pub enum ModelState {
    /// Flat forecast at the last defined moving-average value.
    MovingAverage { last: f64 },
    LinearTrend(LinearTrend),
    Ets(EtsState),
    Arima(ArimaState),
}

#[derive(Debug, Clone)]
pub struct FittedModel {
    pub kind: ModelKind,
    /// Human-readable specification, e.g. `ARIMA(1,1,0)(0,1,1)[12]`.
    pub label: String,
    /// In-sample fitted values aligned with the series; `None` where undefined.
    pub fitted: Vec<Option<f64>>,
    pub criteria: Option<InformationCriteria>,
    pub state: ModelState,
}

impl FittedModel {
    pub fn aic(&self) -> Option<f64> {
        self.criteria.map(|c| c.aic)
    }

    pub fn bic(&self) -> Option<f64> {
        self.criteria.map(|c| c.bic)
    }

    /// Point forecasts for the next `horizon` periods.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        match &self.state {
            ModelState::MovingAverage { last } => vec![*last; horizon],
            ModelState::LinearTrend(line) => line.forecast(horizon),
            ModelState::Ets(state) => state.forecast(horizon),
            ModelState::Arima(state) => state.forecast(horizon),
        }
    }

    /// `actual - fitted` where a fitted value exists.
    pub fn residuals(&self, actual: &[f64]) -> Vec<f64> {
        actual
            .iter()
            .zip(&self.fitted)
            .filter_map(|(a, f)| f.map(|f| a - f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_follow_textbook_formulas() {
        let ic = InformationCriteria::from_log_likelihood(-100.0, 3, 50);
        assert!((ic.aic - 206.0).abs() < 1e-12);
        assert!((ic.bic - (200.0 + 3.0 * 50f64.ln())).abs() < 1e-12);
        assert!((ic.aicc - (206.0 + 24.0 / 46.0)).abs() < 1e-12);
    }

    #[test]
    fn concentrated_likelihood_is_finite_for_perfect_fit() {
        let ll = concentrated_log_likelihood(0.0, 10);
        assert!(ll.is_finite());
        assert!(concentrated_log_likelihood(10.0, 10) < ll);
    }

    #[test]
    fn moving_average_state_forecasts_flat() {
        let model = FittedModel {
            kind: ModelKind::MovingAverage,
            label: "MA(3)".into(),
            fitted: vec![None, Some(2.0), None],
            criteria: None,
            state: ModelState::MovingAverage { last: 2.0 },
        };
        assert_eq!(model.forecast(3), vec![2.0, 2.0, 2.0]);
        assert_eq!(model.residuals(&[1.0, 2.5, 3.0]), vec![0.5]);
        assert_eq!(model.aic(), None);
    }
}
