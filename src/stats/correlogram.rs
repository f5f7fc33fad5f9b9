//! Autocorrelation diagnostics.
//!
//! - sample ACF (biased estimator, `r_0 = 1`)
//! - PACF via the Durbin-Levinson recursion
//! - the white-noise confidence band `±z_{1-α/2} / √n`
//! - the Ljung-Box portmanteau test for residual checks

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::error::AppError;

/// ACF/PACF values for one series.
#[derive(Debug, Clone)]
pub struct Correlogram {
    /// `acf[k]` for `k = 0..=max_lag`.
    pub acf: Vec<f64>,
    /// `pacf[k-1]` for `k = 1..=max_lag`.
    pub pacf: Vec<f64>,
    /// Half-width of the 95% white-noise band.
    pub band: f64,
}

/// `floor(10 * log10(n))`, capped at `n - 1`.
pub fn default_max_lag(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let lag = (10.0 * (n as f64).log10()).floor() as usize;
    lag.min(n - 1)
}

/// Sample autocorrelations for lags `0..=max_lag`.
pub fn acf(x: &[f64], max_lag: usize) -> Result<Vec<f64>, AppError> {
    let n = x.len();
    if n < 2 {
        return Err(AppError::Stats("ACF needs at least 2 observations.".into()));
    }
    let max_lag = max_lag.min(n - 1);
    let mean = x.iter().sum::<f64>() / n as f64;
    let dev: Vec<f64> = x.iter().map(|v| v - mean).collect();
    let c0 = dev.iter().map(|d| d * d).sum::<f64>();
    if c0 <= 0.0 {
        return Err(AppError::Stats("ACF is undefined for a constant series.".into()));
    }

    Ok((0..=max_lag)
        .map(|k| (k..n).map(|t| dev[t] * dev[t - k]).sum::<f64>() / c0)
        .collect())
}

/// Partial autocorrelations from an ACF (`acf[0]` must be 1).
pub fn pacf_from_acf(r: &[f64]) -> Vec<f64> {
    let max_lag = r.len().saturating_sub(1);
    let mut out = Vec::with_capacity(max_lag);
    let mut phi: Vec<f64> = Vec::new();

    for k in 1..=max_lag {
        let num = r[k] - (1..k).map(|j| phi[j - 1] * r[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * r[j]).sum::<f64>();
        let phi_kk = if den.abs() < 1e-12 { 0.0 } else { num / den };

        let mut next = Vec::with_capacity(k);
        for j in 1..k {
            next.push(phi[j - 1] - phi_kk * phi[k - j - 1]);
        }
        next.push(phi_kk);
        phi = next;
        out.push(phi_kk);
    }
    out
}

/// Two-sided white-noise band half-width at level `1 - alpha`.
pub fn confidence_band(n: usize, alpha: f64) -> Result<f64, AppError> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::Stats(format!("normal: {e}")))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0) / (n.max(1) as f64).sqrt())
}

/// ACF, PACF and the 95% band in one go.
pub fn correlogram(x: &[f64], max_lag: usize) -> Result<Correlogram, AppError> {
    let acf = acf(x, max_lag)?;
    let pacf = pacf_from_acf(&acf);
    let band = confidence_band(x.len(), 0.05)?;
    Ok(Correlogram { acf, pacf, band })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LjungBox {
    pub statistic: f64,
    pub lags: usize,
    /// Degrees of freedom after subtracting fitted parameters.
    pub df: usize,
    pub p_value: f64,
}

/// Ljung-Box `Q = n(n+2) Σ r_k² / (n-k)` over `lags`, with `fitted_params`
/// removed from the chi-squared degrees of freedom.
pub fn ljung_box(residuals: &[f64], lags: usize, fitted_params: usize) -> Result<LjungBox, AppError> {
    let n = residuals.len();
    if lags == 0 || lags >= n {
        return Err(AppError::Stats(format!(
            "Ljung-Box lag {lags} out of range for n={n}."
        )));
    }
    if lags <= fitted_params {
        return Err(AppError::Stats(format!(
            "Ljung-Box needs more lags ({lags}) than fitted parameters ({fitted_params})."
        )));
    }
    let r = acf(residuals, lags)?;
    let nf = n as f64;
    let statistic = nf * (nf + 2.0)
        * (1..=lags).map(|k| r[k] * r[k] / (nf - k as f64)).sum::<f64>();

    let df = lags - fitted_params;
    let chi = ChiSquared::new(df as f64).map_err(|e| AppError::Stats(format!("chi-squared: {e}")))?;
    let p_value = 1.0 - chi.cdf(statistic);

    Ok(LjungBox {
        statistic,
        lags,
        df,
        p_value,
    })
}
