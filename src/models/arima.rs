//! Seasonal ARIMA(p,d,q)(P,D,Q)[m] for a fixed order.
//!
//! Estimation is conditional sum of squares (CSS):
//!
//! - difference the series `D` times at lag `m`, then `d` times at lag 1
//! - optionally remove the mean of the differenced series (a constant when
//!   `d + D == 0`, a drift when `d + D == 1`)
//! - multiply out the seasonal and non-seasonal polynomials and minimise the
//!   sum of squared one-step errors with Nelder-Mead
//!
//! Stationarity and invertibility are enforced by rejecting any coefficient
//! vector whose AR or MA polynomial fails the Schur-Cohn step-down test.
//! Order selection lives in `fit::arima_search`.

use serde::Serialize;

use crate::domain::{ModelKind, TimeSeries};
use crate::error::AppError;
use crate::math::{NelderMeadConfig, nelder_mead};
use crate::models::model::{FittedModel, InformationCriteria, ModelState, concentrated_log_likelihood};

const MAX_REFLECTION: f64 = 0.999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    pub fn is_none(&self) -> bool {
        self.p == 0 && self.d == 0 && self.q == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ArimaSpec {
    pub order: ArimaOrder,
    pub seasonal: SeasonalOrder,
    pub include_constant: bool,
}

impl ArimaSpec {
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder, include_constant: bool) -> Self {
        Self {
            order,
            seasonal,
            include_constant,
        }
    }

    pub fn total_differences(&self) -> usize {
        self.order.d + self.seasonal.d
    }

    fn coefficient_count(&self) -> usize {
        self.order.p + self.order.q + self.seasonal.p + self.seasonal.q
    }

    fn period(&self) -> usize {
        if self.seasonal.is_none() { 1 } else { self.seasonal.period }
    }

    pub fn label(&self) -> String {
        let mut out = format!("ARIMA({},{},{})", self.order.p, self.order.d, self.order.q);
        if !self.seasonal.is_none() {
            out.push_str(&format!(
                "({},{},{})[{}]",
                self.seasonal.p, self.seasonal.d, self.seasonal.q, self.seasonal.period
            ));
        }
        if self.include_constant {
            out.push_str(if self.total_differences() == 0 {
                " with non-zero mean"
            } else {
                " with drift"
            });
        }
        out
    }
}

/// Estimated coefficients (sign convention `φ(B) Φ(B^m) w_t = θ(B) Θ(B^m) e_t`
/// with `φ(B) = 1 - Σ φ_i B^i` and `θ(B) = 1 + Σ θ_j B^j`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArimaCoefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sar: Vec<f64>,
    pub sma: Vec<f64>,
    /// Mean (or drift) of the differenced series.
    pub mean: f64,
}

impl ArimaCoefficients {
    fn from_slice(spec: &ArimaSpec, p: &[f64], mean: f64) -> Self {
        let (ar, rest) = p.split_at(spec.order.p);
        let (ma, rest) = rest.split_at(spec.order.q);
        let (sar, sma) = rest.split_at(spec.seasonal.p);
        Self {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sar: sar.to_vec(),
            sma: sma.to_vec(),
            mean,
        }
    }

    fn is_admissible(&self) -> bool {
        let neg = |v: &[f64]| v.iter().map(|c| -c).collect::<Vec<_>>();
        is_stable(&self.ar) && is_stable(&self.sar) && is_stable(&neg(&self.ma)) && is_stable(&neg(&self.sma))
    }
}

/// Everything needed to forecast from the end of the fitted series.
#[derive(Debug, Clone)]
pub struct ArimaState {
    pub spec: ArimaSpec,
    pub coefficients: ArimaCoefficients,
    ar_weights: Vec<f64>,
    ma_weights: Vec<f64>,
    /// Differenced series.
    w: Vec<f64>,
    /// CSS residuals on the differenced scale (zero before the AR warm-up).
    residuals: Vec<f64>,
    /// Series before each differencing step, with the lag used.
    stack: Vec<(Vec<f64>, usize)>,
}

impl ArimaState {
    /// Residuals after the conditioning window.
    pub fn innovations(&self) -> &[f64] {
        &self.residuals[self.ar_weights.len().min(self.residuals.len())..]
    }

    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mean = self.coefficients.mean;
        let mut z: Vec<f64> = self.w.iter().map(|v| v - mean).collect();
        let mut e = self.residuals.clone();
        let n = z.len();

        for t in n..n + horizon {
            let mut v = 0.0;
            for (i, a) in self.ar_weights.iter().enumerate() {
                if let Some(idx) = t.checked_sub(i + 1) {
                    v += a * z[idx];
                }
            }
            for (j, c) in self.ma_weights.iter().enumerate() {
                if let Some(idx) = t.checked_sub(j + 1) {
                    v += c * e[idx];
                }
            }
            z.push(v);
            e.push(0.0);
        }

        let differenced = z[n..].iter().map(|v| v + mean).collect();
        undifference(&self.stack, differenced)
    }
}

pub fn difference(x: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || x.len() <= lag {
        return Vec::new();
    }
    (lag..x.len()).map(|t| x[t] - x[t - lag]).collect()
}

/// Invert a differencing stack for values that continue the differenced series.
fn undifference(stack: &[(Vec<f64>, usize)], mut values: Vec<f64>) -> Vec<f64> {
    for (history, lag) in stack.iter().rev() {
        let mut extended = history.clone();
        for v in &values {
            let base = extended[extended.len() - lag];
            extended.push(v + base);
        }
        values = extended.split_off(history.len());
    }
    values
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Multiply `(1 + sign Σ c_i B^i)(1 + sign Σ C_k B^{mk})` and return the lag weights.
fn expand(nonseasonal: &[f64], seasonal: &[f64], period: usize, sign: f64) -> Vec<f64> {
    let mut a = vec![1.0];
    a.extend(nonseasonal.iter().map(|c| sign * c));
    let mut b = vec![0.0; seasonal.len() * period + 1];
    b[0] = 1.0;
    for (k, c) in seasonal.iter().enumerate() {
        b[(k + 1) * period] = sign * c;
    }
    poly_mul(&a, &b)[1..].iter().map(|c| sign * c).collect()
}

/// `true` when `1 - Σ w_i z^i` has every root outside the unit circle.
///
/// Schur-Cohn step-down: reduce the polynomial one degree at a time and
/// require each reflection coefficient to stay below `MAX_REFLECTION`.
fn is_stable(weights: &[f64]) -> bool {
    if weights.iter().any(|w| !w.is_finite()) {
        return false;
    }
    let mut a = weights.to_vec();
    while let Some(&r) = a.last() {
        if r.abs() >= MAX_REFLECTION {
            return false;
        }
        let k = a.len() - 1;
        let scale = 1.0 - r * r;
        a = (0..k).map(|j| (a[j] + r * a[k - 1 - j]) / scale).collect();
    }
    true
}

fn css_residuals(z: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; z.len()];
    for t in ar.len()..z.len() {
        let mut v = z[t];
        for (i, a) in ar.iter().enumerate() {
            v -= a * z[t - 1 - i];
        }
        for (j, c) in ma.iter().enumerate() {
            if let Some(idx) = t.checked_sub(j + 1) {
                v -= c * e[idx];
            }
        }
        e[t] = v;
    }
    e
}

/// Fit a fixed-order seasonal ARIMA by CSS.
pub fn fit_arima(series: &TimeSeries, spec: &ArimaSpec) -> Result<FittedModel, AppError> {
    let kind = ModelKind::Arima;
    let x = series.values();
    let m = spec.period();

    if !spec.seasonal.is_none() && m < 2 {
        return Err(AppError::model_fit(kind, "seasonal period must be at least 2"));
    }
    if spec.include_constant && spec.total_differences() > 1 {
        return Err(AppError::model_fit(kind, "a constant is only allowed when d + D <= 1"));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::model_fit(kind, "series contains non-finite values"));
    }

    let mut current = x.to_vec();
    let mut stack = Vec::new();
    for _ in 0..spec.seasonal.d {
        let next = difference(&current, m);
        stack.push((std::mem::replace(&mut current, next), m));
    }
    for _ in 0..spec.order.d {
        let next = difference(&current, 1);
        stack.push((std::mem::replace(&mut current, next), 1));
    }
    let w = current;

    let ar_len = spec.order.p + m * spec.seasonal.p;
    let k = spec.coefficient_count() + usize::from(spec.include_constant);
    let n_used = w.len().saturating_sub(ar_len);
    if n_used < k + 3 {
        return Err(AppError::model_fit(
            kind,
            format!("{}: too few observations after differencing (n={})", spec.label(), w.len()),
        ));
    }

    let mean = if spec.include_constant {
        w.iter().sum::<f64>() / w.len() as f64
    } else {
        0.0
    };
    let z: Vec<f64> = w.iter().map(|v| v - mean).collect();

    let sse_for = |coefs: &ArimaCoefficients| -> f64 {
        if !coefs.is_admissible() {
            return f64::INFINITY;
        }
        let ar = expand(&coefs.ar, &coefs.sar, m, -1.0);
        let ma = expand(&coefs.ma, &coefs.sma, m, 1.0);
        css_residuals(&z, &ar, &ma)[ar_len..].iter().map(|e| e * e).sum()
    };

    let dim = spec.coefficient_count();
    let best_point = if dim == 0 {
        Vec::new()
    } else {
        let objective = |p: &[f64]| sse_for(&ArimaCoefficients::from_slice(spec, p, mean));
        let config = NelderMeadConfig {
            max_iter: 500 * dim,
            tolerance: 1e-10,
            initial_step: 0.1,
        };
        let first = nelder_mead(objective, &vec![0.0; dim], None, config);
        let second = nelder_mead(objective, &first.point, None, config);
        if second.value <= first.value { second.point } else { first.point }
    };

    let coefficients = ArimaCoefficients::from_slice(spec, &best_point, mean);
    let sse = sse_for(&coefficients);
    if !sse.is_finite() {
        return Err(AppError::model_fit(
            kind,
            format!("{}: no stationary/invertible solution found", spec.label()),
        ));
    }

    let ar_weights = expand(&coefficients.ar, &coefficients.sar, m, -1.0);
    let ma_weights = expand(&coefficients.ma, &coefficients.sma, m, 1.0);
    let residuals = css_residuals(&z, &ar_weights, &ma_weights);

    let log_likelihood = concentrated_log_likelihood(sse, n_used);
    let criteria = InformationCriteria::from_log_likelihood(log_likelihood, k + 1, n_used);

    let offset = x.len() - w.len();
    let mut fitted = vec![None; x.len()];
    for i in ar_len..w.len() {
        fitted[offset + i] = Some(x[offset + i] - residuals[i]);
    }

    tracing::debug!(model = %spec.label(), sse, aicc = criteria.aicc, "arima fit");

    Ok(FittedModel {
        kind,
        label: spec.label(),
        fitted,
        criteria: Some(criteria),
        state: ModelState::Arima(ArimaState {
            spec: *spec,
            coefficients,
            ar_weights,
            ma_weights,
            w,
            residuals,
            stack,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YearMonth;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn monthly(values: Vec<f64>) -> TimeSeries {
        TimeSeries::monthly(YearMonth::new(2015, 1).unwrap(), values)
    }

    fn order(p: usize, d: usize, q: usize) -> ArimaOrder {
        ArimaOrder { p, d, q }
    }

    fn arima_state(fit: &FittedModel) -> &ArimaState {
        match &fit.state {
            ModelState::Arima(s) => s,
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn labels() {
        let spec = ArimaSpec::new(
            order(1, 1, 0),
            SeasonalOrder { p: 0, d: 1, q: 1, period: 12 },
            false,
        );
        assert_eq!(spec.label(), "ARIMA(1,1,0)(0,1,1)[12]");
        let drift = ArimaSpec::new(order(0, 1, 1), SeasonalOrder::default(), true);
        assert_eq!(drift.label(), "ARIMA(0,1,1) with drift");
    }

    #[test]
    fn seasonal_expansion_multiplies_polynomials() {
        // (1 - 0.5B)(1 - 0.3B^4) = 1 - 0.5B - 0.3B^4 + 0.15B^5
        let ar = expand(&[0.5], &[0.3], 4, -1.0);
        let expected = [0.5, 0.0, 0.0, 0.3, -0.15];
        assert_eq!(ar.len(), expected.len());
        for (a, b) in ar.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
        // (1 + 0.4B)(1 + 0.2B^2) = 1 + 0.4B + 0.2B^2 + 0.08B^3
        let ma = expand(&[0.4], &[0.2], 2, 1.0);
        for (a, b) in ma.iter().zip([0.4, 0.2, 0.08]) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn stability_check_rejects_unit_and_explosive_roots() {
        assert!(is_stable(&[]));
        assert!(is_stable(&[0.5]));
        assert!(!is_stable(&[1.2]));
        // roots of z^2 - 0.5z - 0.3 are 0.85 and -0.35
        assert!(is_stable(&[0.5, 0.3]));
        // largest root of z^2 - 0.5z - 0.6 is 1.06
        assert!(!is_stable(&[0.5, 0.6]));
        assert!(!is_stable(&[1.0]));
        // 1 - z^3 has roots on the unit circle
        assert!(!is_stable(&[0.0, 0.0, 1.0]));
        assert!(!is_stable(&[0.1, f64::NAN]));
    }

    #[test]
    fn zero_weights_of_any_length_are_stable() {
        for p in 1..=30 {
            assert!(is_stable(&vec![0.0; p]), "p={p}");
        }
    }

    fn ar2_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![0.0, 0.0];
        for _ in 2..n {
            let v = 0.4 * x[x.len() - 1] - 0.2 * x[x.len() - 2] + normal.sample(&mut rng);
            x.push(v);
        }
        x
    }

    #[test]
    fn third_order_ar_and_ma_fits_complete() {
        let series = monthly(ar2_noise(100, 5));
        for (p, q) in [(3, 0), (0, 3), (5, 0), (0, 5), (3, 2)] {
            let spec = ArimaSpec::new(order(p, 0, q), SeasonalOrder::default(), true);
            let fit = fit_arima(&series, &spec).unwrap();
            let state = arima_state(&fit);
            assert_eq!(state.coefficients.ar.len(), p);
            assert_eq!(state.coefficients.ma.len(), q);
            assert!(fit.aic().is_some_and(f64::is_finite), "{}", spec.label());
            assert!(fit.forecast(6).iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn seasonal_ar_with_long_lag_polynomial_fits() {
        let x: Vec<f64> = ar2_noise(120, 8)
            .iter()
            .enumerate()
            .map(|(t, v)| 20.0 + v + 4.0 * (2.0 * std::f64::consts::PI * t as f64 / 12.0).sin())
            .collect();
        let spec = ArimaSpec::new(
            order(3, 0, 2),
            SeasonalOrder { p: 1, d: 1, q: 0, period: 12 },
            true,
        );
        let fit = fit_arima(&monthly(x), &spec).unwrap();
        assert_eq!(fit.forecast(12).len(), 12);
    }

    #[test]
    fn differencing_round_trips_through_stack() {
        let x = vec![1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
        let d1 = difference(&x, 1);
        let d2 = difference(&d1, 1);
        assert_eq!(d2, vec![2.0, 2.0, 2.0, 2.0]);
        let stack = vec![(x.clone(), 1), (d1.clone(), 1)];
        let fc = undifference(&stack, vec![2.0, 2.0]);
        assert_eq!(fc, vec![49.0, 64.0]);
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let mut rng = StdRng::seed_from_u64(21);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![0.0];
        for _ in 1..400 {
            let prev = *x.last().unwrap();
            x.push(0.6 * prev + normal.sample(&mut rng));
        }
        let spec = ArimaSpec::new(order(1, 0, 0), SeasonalOrder::default(), false);
        let fit = fit_arima(&monthly(x), &spec).unwrap();
        let state = arima_state(&fit);
        assert!((state.coefficients.ar[0] - 0.6).abs() < 0.1);
        assert!(fit.fitted[0].is_none());
        assert!(fit.fitted[1].is_some());
    }

    #[test]
    fn random_walk_with_drift_forecasts_linearly() {
        let x: Vec<f64> = (0..50).map(|t| 3.0 + 1.5 * t as f64).collect();
        let spec = ArimaSpec::new(order(0, 1, 0), SeasonalOrder::default(), true);
        let fit = fit_arima(&monthly(x), &spec).unwrap();
        let fc = fit.forecast(3);
        assert!((fc[0] - (3.0 + 1.5 * 50.0)).abs() < 1e-9);
        assert!((fc[2] - (3.0 + 1.5 * 52.0)).abs() < 1e-9);
    }

    #[test]
    fn seasonal_difference_forecast_repeats_pattern() {
        let pattern = [5.0, 7.0, 6.0, 9.0];
        let x: Vec<f64> = (0..24).map(|t| pattern[t % 4] + 10.0).collect();
        let spec = ArimaSpec::new(
            order(0, 0, 0),
            SeasonalOrder { p: 0, d: 1, q: 0, period: 4 },
            false,
        );
        let fit = fit_arima(&monthly(x), &spec).unwrap();
        let fc = fit.forecast(4);
        for (f, p) in fc.iter().zip(pattern) {
            assert!((f - (p + 10.0)).abs() < 1e-12);
        }
        assert!(fit.fitted[..4].iter().all(Option::is_none));
    }

    #[test]
    fn constant_with_two_differences_is_rejected() {
        let spec = ArimaSpec::new(order(0, 2, 0), SeasonalOrder::default(), true);
        let err = fit_arima(&monthly((0..30).map(|t| t as f64).collect()), &spec).unwrap_err();
        assert!(matches!(err, AppError::ModelFit { .. }));
    }
}
