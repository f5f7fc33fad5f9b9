//! Exponential smoothing (ETS) in Holt-Winters error-correction form.
//!
//! Supported specifications:
//!
//! | spec        | model                          |
//! |-------------|--------------------------------|
//! | `ETS(A,N,N)`| simple exponential smoothing   |
//! | `ETS(A,A,N)`| Holt linear trend              |
//! | `ETS(A,A,A)`| Holt-Winters additive          |
//! | `ETS(M,A,M)`| Holt-Winters multiplicative    |
//!
//! Smoothing weights are estimated by Nelder-Mead on the Gaussian
//! likelihood (relative errors plus the `Σ ln|ŷ|` Jacobian term when the error
//! is multiplicative). Initial states are set heuristically from the first
//! observations and are not optimised, but they still count as parameters in
//! the information criteria.

use crate::domain::{ModelKind, TimeSeries};
use crate::error::AppError;
use crate::math::{NelderMeadConfig, nelder_mead};
use crate::models::model::{FittedModel, InformationCriteria, ModelState, concentrated_log_likelihood};

const PARAM_BOUNDS: (f64, f64) = (1e-4, 0.9999);
const START_POINT: [f64; 3] = [0.3, 0.1, 0.1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendType {
    None,
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonType {
    None,
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtsSpec {
    pub error: ErrorType,
    pub trend: TrendType,
    pub season: SeasonType,
    /// Season length; ignored when `season` is `None`.
    pub period: usize,
}

impl EtsSpec {
    pub fn simple() -> Self {
        Self {
            error: ErrorType::Additive,
            trend: TrendType::None,
            season: SeasonType::None,
            period: 1,
        }
    }

    pub fn holt() -> Self {
        Self {
            trend: TrendType::Additive,
            ..Self::simple()
        }
    }

    pub fn holt_winters_additive(period: usize) -> Self {
        Self {
            season: SeasonType::Additive,
            period,
            ..Self::holt()
        }
    }

    pub fn holt_winters_multiplicative(period: usize) -> Self {
        Self {
            error: ErrorType::Multiplicative,
            season: SeasonType::Multiplicative,
            period,
            ..Self::holt()
        }
    }

    pub fn kind(&self) -> ModelKind {
        match (self.trend, self.season) {
            (TrendType::None, SeasonType::None) => ModelKind::EtsSimple,
            (TrendType::Additive, SeasonType::None) => ModelKind::EtsHolt,
            (_, SeasonType::Additive) => ModelKind::EtsHoltWintersAdditive,
            (_, SeasonType::Multiplicative) => ModelKind::EtsHoltWintersMultiplicative,
        }
    }

    pub fn label(&self) -> String {
        let e = match self.error {
            ErrorType::Additive => "A",
            ErrorType::Multiplicative => "M",
        };
        let t = match self.trend {
            TrendType::None => "N",
            TrendType::Additive => "A",
        };
        let s = match self.season {
            SeasonType::None => "N",
            SeasonType::Additive => "A",
            SeasonType::Multiplicative => "M",
        };
        format!("ETS({e},{t},{s})")
    }

    fn has_trend(&self) -> bool {
        self.trend != TrendType::None
    }

    fn has_season(&self) -> bool {
        self.season != SeasonType::None
    }

    fn season_length(&self) -> usize {
        if self.has_season() { self.period.max(1) } else { 1 }
    }

    fn smoothing_count(&self) -> usize {
        1 + usize::from(self.has_trend()) + usize::from(self.has_season())
    }

    /// Smoothing weights + free initial states + innovation variance.
    fn parameter_count(&self) -> usize {
        let initial = 1
            + usize::from(self.has_trend())
            + if self.has_season() { self.season_length() - 1 } else { 0 };
        self.smoothing_count() + initial + 1
    }

    fn needs_positive_data(&self) -> bool {
        self.error == ErrorType::Multiplicative || self.season == SeasonType::Multiplicative
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtsParams {
    pub alpha: f64,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
}

impl EtsParams {
    fn from_slice(spec: &EtsSpec, p: &[f64]) -> Self {
        let mut it = p.iter().copied();
        let alpha = it.next().unwrap_or(START_POINT[0]);
        let beta = spec.has_trend().then(|| it.next().unwrap_or(START_POINT[1]));
        let gamma = spec.has_season().then(|| it.next().unwrap_or(START_POINT[2]));
        Self { alpha, beta, gamma }
    }
}

/// Final smoothing state after the last observation.
#[derive(Debug, Clone)]
pub struct EtsState {
    pub spec: EtsSpec,
    pub params: EtsParams,
    pub level: f64,
    pub trend: f64,
    /// Seasonal state by cycle position (`t % period`).
    seasonals: Vec<f64>,
    /// Observations consumed.
    n: usize,
}

impl EtsState {
    pub fn seasonal(&self) -> &[f64] {
        &self.seasonals
    }

    pub fn seasonal_amplitude(&self) -> f64 {
        crate::stats::stl::half_range(&self.seasonals)
    }

    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let m = self.spec.season_length();
        (1..=horizon)
            .map(|k| {
                let base = self.level + k as f64 * self.trend;
                match self.spec.season {
                    SeasonType::None => base,
                    SeasonType::Additive => base + self.seasonals[(self.n - 1 + k) % m],
                    SeasonType::Multiplicative => base * self.seasonals[(self.n - 1 + k) % m],
                }
            })
            .collect()
    }
}

/// Result of one pass of the recursions for fixed smoothing weights.
struct Pass {
    state: EtsState,
    fitted: Vec<Option<f64>>,
    sse: f64,
    sum_log_forecast: f64,
    count: usize,
}

impl Pass {
    fn log_likelihood(&self) -> f64 {
        let ll = concentrated_log_likelihood(self.sse, self.count);
        match self.state.spec.error {
            ErrorType::Additive => ll,
            ErrorType::Multiplicative => ll - self.sum_log_forecast,
        }
    }
}

/// Heuristic states one step before the first observation, so every
/// observation gets a one-step-ahead fitted value.
fn initial_state(spec: &EtsSpec, y: &[f64]) -> Result<(f64, f64, Vec<f64>), String> {
    if !spec.has_season() {
        let trend = if spec.has_trend() { y[1] - y[0] } else { 0.0 };
        return Ok((y[0] - trend, trend, vec![0.0]));
    }

    let m = spec.season_length();
    let mean_first = y[..m].iter().sum::<f64>() / m as f64;
    let mean_second = y[m..2 * m].iter().sum::<f64>() / m as f64;
    let trend = if spec.has_trend() {
        (mean_second - mean_first) / m as f64
    } else {
        0.0
    };
    let mid = (m as f64 - 1.0) / 2.0;
    let centre = |i: usize| mean_first + trend * (i as f64 - mid);

    let mut seasonals = Vec::with_capacity(m);
    for (i, &v) in y[..m].iter().enumerate() {
        let c = centre(i);
        let s = match spec.season {
            SeasonType::Multiplicative => {
                if c <= 0.0 {
                    return Err("non-positive level in the first season".to_string());
                }
                v / c
            }
            _ => v - c,
        };
        seasonals.push(s);
    }

    let avg = seasonals.iter().sum::<f64>() / m as f64;
    match spec.season {
        SeasonType::Multiplicative => seasonals.iter_mut().for_each(|s| *s /= avg),
        _ => seasonals.iter_mut().for_each(|s| *s -= avg),
    }

    // level + trend reproduces the centred first-season value at t = 0
    Ok((centre(0) - trend, trend, seasonals))
}

fn run(spec: &EtsSpec, params: EtsParams, y: &[f64]) -> Option<Pass> {
    let (mut level, mut trend, mut seasonals) = initial_state(spec, y).ok()?;
    let m = spec.season_length();
    let alpha = params.alpha;
    let beta = params.beta.unwrap_or(0.0);
    let gamma = params.gamma.unwrap_or(0.0);

    let mut fitted = vec![None; y.len()];
    let mut sse = 0.0;
    let mut sum_log_forecast = 0.0;

    for (t, &obs) in y.iter().enumerate() {
        let idx = t % m;
        let s = seasonals[idx];
        let base = level + trend;
        let forecast = match spec.season {
            SeasonType::None => base,
            SeasonType::Additive => base + s,
            SeasonType::Multiplicative => {
                if base <= 0.0 || s <= 0.0 {
                    return None;
                }
                base * s
            }
        };
        if !forecast.is_finite() {
            return None;
        }

        let error = obs - forecast;
        match spec.error {
            ErrorType::Additive => sse += error * error,
            ErrorType::Multiplicative => {
                if forecast.abs() < 1e-10 {
                    return None;
                }
                let rel = error / forecast;
                sse += rel * rel;
                sum_log_forecast += forecast.abs().ln();
            }
        }
        fitted[t] = Some(forecast);

        let new_level = match spec.season {
            SeasonType::None => alpha * obs + (1.0 - alpha) * base,
            SeasonType::Additive => alpha * (obs - s) + (1.0 - alpha) * base,
            SeasonType::Multiplicative => alpha * (obs / s) + (1.0 - alpha) * base,
        };
        if spec.has_trend() {
            trend = beta * (new_level - level) + (1.0 - beta) * trend;
        }
        match spec.season {
            SeasonType::None => {}
            SeasonType::Additive => seasonals[idx] = gamma * (obs - base) + (1.0 - gamma) * s,
            SeasonType::Multiplicative => seasonals[idx] = gamma * (obs / base) + (1.0 - gamma) * s,
        }
        level = new_level;
    }

    if !(sse.is_finite() && level.is_finite() && trend.is_finite()) {
        return None;
    }

    Some(Pass {
        state: EtsState {
            spec: *spec,
            params,
            level,
            trend,
            seasonals,
            n: y.len(),
        },
        fitted,
        sse,
        sum_log_forecast,
        count: y.len(),
    })
}

fn objective(spec: &EtsSpec, y: &[f64], p: &[f64]) -> f64 {
    match run(spec, EtsParams::from_slice(spec, p), y) {
        Some(pass) => -pass.log_likelihood(),
        None => f64::INFINITY,
    }
}

/// Fit an ETS model with estimated smoothing weights.
pub fn fit_ets(series: &TimeSeries, spec: EtsSpec) -> Result<FittedModel, AppError> {
    let kind = spec.kind();
    let y = series.values();
    let n = y.len();

    if spec.has_season() {
        let m = spec.season_length();
        if m < 2 {
            return Err(AppError::model_fit(kind, "seasonal period must be at least 2"));
        }
        if n < 2 * m {
            return Err(AppError::model_fit(
                kind,
                format!("needs at least two full seasons (n={n}, period={m})"),
            ));
        }
    } else if n < 3 {
        return Err(AppError::model_fit(kind, format!("needs at least 3 observations (n={n})")));
    }

    if let Some(v) = y.iter().find(|v| !v.is_finite()) {
        return Err(AppError::model_fit(kind, format!("non-finite value {v}")));
    }
    if spec.needs_positive_data() {
        if let Some((i, v)) = y.iter().enumerate().find(|(_, v)| **v <= 0.0) {
            return Err(AppError::model_fit(
                kind,
                format!(
                    "multiplicative components need strictly positive data (value {v} at {})",
                    series.period_of(i)
                ),
            ));
        }
    }
    initial_state(&spec, y).map_err(|reason| AppError::model_fit(kind, reason))?;

    let dim = spec.smoothing_count();
    let bounds = [PARAM_BOUNDS; 3];
    let config = NelderMeadConfig {
        max_iter: 1000,
        tolerance: 1e-10,
        initial_step: 0.1,
    };
    let first = nelder_mead(|p| objective(&spec, y, p), &START_POINT[..dim], Some(&bounds[..dim]), config);
    // Restart from the optimum to escape a collapsed simplex.
    let result = nelder_mead(|p| objective(&spec, y, p), &first.point, Some(&bounds[..dim]), config);
    let result = if result.value <= first.value { result } else { first };

    if !result.value.is_finite() {
        return Err(AppError::model_fit(kind, "likelihood optimisation did not converge"));
    }

    let params = EtsParams::from_slice(&spec, &result.point);
    let pass = run(&spec, params, y)
        .ok_or_else(|| AppError::model_fit(kind, "state recursion became invalid"))?;
    let criteria =
        InformationCriteria::from_log_likelihood(pass.log_likelihood(), spec.parameter_count(), pass.count);

    tracing::debug!(
        model = %spec.label(),
        alpha = params.alpha,
        beta = ?params.beta,
        gamma = ?params.gamma,
        aic = criteria.aic,
        "ets fit"
    );

    Ok(FittedModel {
        kind,
        label: spec.label(),
        fitted: pass.fitted,
        criteria: Some(criteria),
        state: ModelState::Ets(pass.state),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YearMonth;
    use std::f64::consts::PI;

    fn monthly(values: Vec<f64>) -> TimeSeries {
        TimeSeries::monthly(YearMonth::new(2015, 1).unwrap(), values)
    }

    fn seasonal_values(n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|t| 100.0 + 0.8 * t as f64 + amplitude * (2.0 * PI * t as f64 / 12.0).sin())
            .collect()
    }

    fn ets_state(fit: &FittedModel) -> &EtsState {
        match &fit.state {
            ModelState::Ets(s) => s,
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn labels_and_kinds() {
        assert_eq!(EtsSpec::simple().label(), "ETS(A,N,N)");
        assert_eq!(EtsSpec::holt().kind(), ModelKind::EtsHolt);
        assert_eq!(EtsSpec::holt_winters_multiplicative(12).label(), "ETS(M,A,M)");
        assert_eq!(EtsSpec::holt_winters_additive(12).parameter_count(), 3 + 2 + 11 + 1);
    }

    #[test]
    fn simple_smoothing_on_constant_series_forecasts_constant() {
        let fit = fit_ets(&monthly(vec![5.0; 30]), EtsSpec::simple()).unwrap();
        for v in fit.forecast(4) {
            assert!((v - 5.0).abs() < 1e-9);
        }
        assert!(fit.fitted.iter().all(Option::is_some));
        assert!(fit.aic().is_some() && fit.bic().is_some());
    }

    #[test]
    fn holt_extrapolates_linear_trend() {
        let values: Vec<f64> = (0..40).map(|t| 10.0 + 2.0 * t as f64).collect();
        let fit = fit_ets(&monthly(values), EtsSpec::holt()).unwrap();
        let fc = fit.forecast(3);
        assert!((fc[0] - 90.0).abs() < 1e-6);
        assert!((fc[2] - 94.0).abs() < 1e-6);
    }

    #[test]
    fn additive_holt_winters_recovers_seasonal_amplitude() {
        let amplitude = 10.0;
        let fit = fit_ets(&monthly(seasonal_values(96, amplitude)), EtsSpec::holt_winters_additive(12)).unwrap();
        let state = ets_state(&fit);
        assert_eq!(state.seasonal().len(), 12);
        assert!((state.seasonal_amplitude() - amplitude).abs() < 0.1 * amplitude);
    }

    #[test]
    fn multiplicative_holt_winters_tracks_positive_seasonal_series() {
        let fit = fit_ets(&monthly(seasonal_values(96, 10.0)), EtsSpec::holt_winters_multiplicative(12)).unwrap();
        let fc = fit.forecast(12);
        assert!(fc.iter().all(|v| v.is_finite() && *v > 0.0));
        let c = fit.criteria.unwrap();
        assert_eq!(c.n_obs, 96);
    }

    #[test]
    fn multiplicative_fit_rejects_non_positive_values() {
        let mut values = seasonal_values(48, 5.0);
        values[20] = 0.0;
        let err = fit_ets(&monthly(values), EtsSpec::holt_winters_multiplicative(12)).unwrap_err();
        assert!(matches!(
            err,
            AppError::ModelFit { model: ModelKind::EtsHoltWintersMultiplicative, .. }
        ));
    }

    #[test]
    fn seasonal_models_fit_every_observation() {
        let values = seasonal_values(60, 6.0);
        for spec in [EtsSpec::holt_winters_additive(12), EtsSpec::holt_winters_multiplicative(12)] {
            let fit = fit_ets(&monthly(values.clone()), spec).unwrap();
            assert_eq!(fit.fitted.len(), 60);
            assert!(fit.fitted.iter().all(Option::is_some), "{}", spec.label());
            assert_eq!(fit.criteria.unwrap().n_obs, 60);
        }
        // first forecast sits on the centred first-season value
        let fit = fit_ets(&monthly(values.clone()), EtsSpec::holt_winters_additive(12)).unwrap();
        assert!((fit.fitted[0].unwrap() - values[0]).abs() < 2.0);
    }

    #[test]
    fn seasonal_fit_needs_two_full_seasons() {
        let err = fit_ets(&monthly(seasonal_values(23, 5.0)), EtsSpec::holt_winters_additive(12)).unwrap_err();
        assert!(matches!(err, AppError::ModelFit { .. }));
    }
}
