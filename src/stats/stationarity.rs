//! Unit-root (ADF) and stationarity (KPSS) tests.
//!
//! Both tests follow the usual R `tseries` conventions:
//!
//! - ADF regresses `Δx_t` on a constant, a linear trend, `x_{t-1}` and
//!   `k = trunc((N-1)^(1/3))` lagged differences; the statistic is the t-ratio
//!   of the `x_{t-1}` coefficient.
//! - KPSS uses a Bartlett-weighted long-run variance with the short lag
//!   truncation `l = trunc(4 (n/100)^(1/4))`.
//!
//! p-values are interpolated from the published critical-value tables and
//! clamped to the table range (0.01..0.99 for ADF, 0.01..0.10 for KPSS).

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::{interp_clamped, ols_fit};

/// Significance level used by the documented decision rule.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Dickey-Fuller sample sizes for the constant+trend table.
const ADF_SIZES: [f64; 6] = [25.0, 50.0, 100.0, 250.0, 500.0, 100_000.0];
const ADF_PROBS: [f64; 8] = [0.01, 0.025, 0.05, 0.10, 0.90, 0.95, 0.975, 0.99];
/// Critical values (negated) per probability level, one row per entry of `ADF_PROBS`.
const ADF_TABLE: [[f64; 6]; 8] = [
    [4.38, 4.15, 4.04, 3.99, 3.98, 3.96],
    [3.95, 3.80, 3.73, 3.69, 3.68, 3.66],
    [3.60, 3.50, 3.45, 3.43, 3.42, 3.41],
    [3.24, 3.18, 3.15, 3.13, 3.13, 3.12],
    [1.14, 1.19, 1.22, 1.23, 1.24, 1.25],
    [0.80, 0.87, 0.90, 0.92, 0.93, 0.94],
    [0.50, 0.58, 0.62, 0.64, 0.65, 0.66],
    [0.15, 0.24, 0.28, 0.31, 0.32, 0.33],
];

const KPSS_PROBS: [f64; 4] = [0.10, 0.05, 0.025, 0.01];
const KPSS_LEVEL: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_TREND: [f64; 4] = [0.119, 0.146, 0.176, 0.216];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Lag order (ADF lagged differences, KPSS truncation lag).
    pub lags: usize,
}

/// Null hypothesis for the KPSS test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KpssNull {
    #[default]
    Level,
    Trend,
}

/// Default ADF lag order for a series of length `n`.
pub fn adf_default_lags(n: usize) -> usize {
    ((n.saturating_sub(1)) as f64).cbrt().trunc() as usize
}

/// Augmented Dickey-Fuller test with the default lag order.
pub fn adf_test(x: &[f64]) -> Result<TestResult, AppError> {
    adf_test_with_lags(x, adf_default_lags(x.len()))
}

/// Augmented Dickey-Fuller test with `lags` lagged differences.
pub fn adf_test_with_lags(x: &[f64], lags: usize) -> Result<TestResult, AppError> {
    let k = lags + 1;
    let dy: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let n = dy.len();
    let cols = 3 + lags;
    if n < k || n + 1 - k <= cols {
        return Err(AppError::Stats(format!(
            "ADF needs more observations (n={}, lags={lags}).",
            x.len()
        )));
    }

    let rows = n + 1 - k;
    let mut design = DMatrix::zeros(rows, cols);
    let mut target = DVector::zeros(rows);
    for (r, t) in (k - 1..n).enumerate() {
        target[r] = dy[t];
        design[(r, 0)] = 1.0;
        design[(r, 1)] = x[t];
        design[(r, 2)] = (t + 1) as f64;
        for i in 1..k {
            design[(r, 2 + i)] = dy[t - i];
        }
    }

    let fit = ols_fit(&design, &target)
        .ok_or_else(|| AppError::Stats("ADF regression is singular.".into()))?;
    let statistic = fit.beta[1] / fit.std_errors[1];
    if !statistic.is_finite() {
        return Err(AppError::Stats("ADF statistic is not finite (perfect fit).".into()));
    }

    let p_value = adf_p_value(statistic, n as f64)?;
    Ok(TestResult {
        statistic,
        p_value,
        lags,
    })
}

fn adf_p_value(statistic: f64, n: f64) -> Result<f64, AppError> {
    let mut crit = Vec::with_capacity(ADF_PROBS.len());
    for row in &ADF_TABLE {
        let negated: Vec<f64> = row.iter().map(|v| -v).collect();
        let c = interp_clamped(&ADF_SIZES, &negated, n)
            .ok_or_else(|| AppError::Stats("ADF table interpolation failed.".into()))?;
        crit.push(c);
    }
    interp_clamped(&crit, &ADF_PROBS, statistic)
        .ok_or_else(|| AppError::Stats("ADF p-value interpolation failed.".into()))
}

/// KPSS truncation lag for a series of length `n`.
pub fn kpss_default_lags(n: usize) -> usize {
    (4.0 * (n as f64 / 100.0).powf(0.25)).trunc() as usize
}

/// KPSS test for level or trend stationarity.
pub fn kpss_test(x: &[f64], null: KpssNull) -> Result<TestResult, AppError> {
    let n = x.len();
    if n < 3 {
        return Err(AppError::Stats(format!("KPSS needs at least 3 observations (n={n}).")));
    }

    let residuals = match null {
        KpssNull::Level => {
            let mean = x.iter().sum::<f64>() / n as f64;
            x.iter().map(|v| v - mean).collect::<Vec<_>>()
        }
        KpssNull::Trend => {
            let design = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { (r + 1) as f64 });
            let fit = ols_fit(&design, &DVector::from_column_slice(x))
                .ok_or_else(|| AppError::Stats("KPSS detrending regression failed.".into()))?;
            fit.residuals.iter().copied().collect()
        }
    };

    let lags = kpss_default_lags(n);
    let nf = n as f64;
    let mut partial = 0.0;
    let mut eta = 0.0;
    for e in &residuals {
        partial += e;
        eta += partial * partial;
    }
    eta /= nf * nf;

    let s2 = bartlett_long_run_variance(&residuals, lags);
    if !(s2.is_finite() && s2 > 0.0) {
        // Constant input: nothing to reject.
        return Ok(TestResult {
            statistic: 0.0,
            p_value: KPSS_PROBS[0],
            lags,
        });
    }

    let statistic = eta / s2;
    let table: &[f64] = match null {
        KpssNull::Level => &KPSS_LEVEL,
        KpssNull::Trend => &KPSS_TREND,
    };
    let p_value = interp_clamped(table, &KPSS_PROBS, statistic)
        .ok_or_else(|| AppError::Stats("KPSS p-value interpolation failed.".into()))?;

    Ok(TestResult {
        statistic,
        p_value,
        lags,
    })
}

/// Newey-West long-run variance with Bartlett weights.
fn bartlett_long_run_variance(e: &[f64], lags: usize) -> f64 {
    let n = e.len() as f64;
    let mut s2 = e.iter().map(|v| v * v).sum::<f64>() / n;
    for i in 1..=lags.min(e.len().saturating_sub(1)) {
        let weight = 1.0 - i as f64 / (lags as f64 + 1.0);
        let cov: f64 = (i..e.len()).map(|t| e[t] * e[t - i]).sum();
        s2 += 2.0 * weight * cov / n;
    }
    s2
}

/// ADF + KPSS pair for one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationarityReport {
    pub adf: TestResult,
    pub kpss: TestResult,
}

impl StationarityReport {
    /// Stationary when ADF rejects a unit root and KPSS does not reject stationarity.
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.adf.p_value < alpha && self.kpss.p_value > alpha
    }
}

/// Run both tests (KPSS with a level null).
pub fn test_stationarity(x: &[f64]) -> Result<StationarityReport, AppError> {
    Ok(StationarityReport {
        adf: adf_test(x)?,
        kpss: kpss_test(x, KpssNull::Level)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn default_lag_orders() {
        assert_eq!(adf_default_lags(120), 4);
        assert_eq!(adf_default_lags(30), 3);
        assert_eq!(kpss_default_lags(100), 4);
        assert_eq!(kpss_default_lags(120), 4);
        assert_eq!(kpss_default_lags(30), 2);
    }

    #[test]
    fn adf_rejects_unit_root_for_white_noise() {
        let x = white_noise(400, 7);
        let res = adf_test(&x).unwrap();
        assert!(res.statistic < -4.0, "stat={}", res.statistic);
        assert!((res.p_value - 0.01).abs() < 1e-12);
    }

    #[test]
    fn random_walk_is_not_judged_stationary() {
        let mut level = 0.0;
        let x: Vec<f64> = white_noise(300, 11)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();
        let report = test_stationarity(&x).unwrap();
        assert!(!report.is_stationary(DEFAULT_ALPHA), "{report:?}");

        let diffed: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let report = test_stationarity(&diffed).unwrap();
        assert!(report.adf.p_value < DEFAULT_ALPHA);
    }

    #[test]
    fn adf_p_value_is_clamped_to_table() {
        assert!((adf_p_value(-100.0, 100.0).unwrap() - 0.01).abs() < 1e-12);
        assert!((adf_p_value(5.0, 100.0).unwrap() - 0.99).abs() < 1e-12);
        // Exactly the 5% critical value at n=100.
        assert!((adf_p_value(-3.45, 100.0).unwrap() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn adf_errors_on_short_series() {
        assert!(matches!(adf_test(&[1.0, 2.0, 3.0]), Err(AppError::Stats(_))));
    }

    #[test]
    fn kpss_rejects_level_stationarity_for_trend() {
        let x: Vec<f64> = (0..120).map(|t| t as f64 + (t as f64 * 0.7).sin()).collect();
        let res = kpss_test(&x, KpssNull::Level).unwrap();
        assert!((res.p_value - 0.01).abs() < 1e-12, "stat={}", res.statistic);
    }

    #[test]
    fn kpss_alternating_series_matches_hand_computation() {
        // e_t = ±1, eta = 1/(2n), s2 = 1 - 0.8 = 0.2 for n=100, l=4.
        let x: Vec<f64> = (0..100).map(|t| if t % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let res = kpss_test(&x, KpssNull::Level).unwrap();
        assert_eq!(res.lags, 4);
        assert!((res.statistic - 0.025).abs() < 1e-12);
        assert!((res.p_value - 0.10).abs() < 1e-12);
    }

    #[test]
    fn kpss_trend_null_accepts_trend_stationary_series() {
        let x: Vec<f64> = (0..100)
            .map(|t| 2.0 * t as f64 + if t % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let res = kpss_test(&x, KpssNull::Trend).unwrap();
        assert!(res.p_value > 0.05);
    }

    #[test]
    fn decision_rule_requires_both_tests() {
        let report = StationarityReport {
            adf: TestResult { statistic: -5.0, p_value: 0.01, lags: 4 },
            kpss: TestResult { statistic: 0.1, p_value: 0.1, lags: 4 },
        };
        assert!(report.is_stationary(DEFAULT_ALPHA));

        let failing_kpss = StationarityReport {
            kpss: TestResult { statistic: 1.0, p_value: 0.01, lags: 4 },
            ..report
        };
        assert!(!failing_kpss.is_stationary(DEFAULT_ALPHA));
    }
}
