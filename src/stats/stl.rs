//! Seasonal-trend decomposition by loess (Cleveland et al., 1990).
//!
//! Only the configuration this tool needs is implemented:
//!
//! - periodic seasonal window (`s.window = "periodic"`, degree 0)
//! - loess degree 1 for trend and low-pass smoothers
//! - two inner passes, no robustness iterations
//! - every point evaluated (no jump interpolation)
//!
//! The periodic seasonal is finally replaced by its cycle-position means and
//! the remainder recomputed, so `trend + seasonal + remainder == x`.

use crate::error::AppError;

const INNER_PASSES: usize = 2;
/// Seasonal strength above which one seasonal difference is taken.
pub const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

#[derive(Debug, Clone)]
pub struct StlConfig {
    pub period: usize,
    pub seasonal_window: usize,
    pub trend_window: usize,
    pub lowpass_window: usize,
}

impl StlConfig {
    /// Window defaults for a periodic decomposition of `n` observations.
    pub fn periodic(period: usize, n: usize) -> Self {
        let seasonal_window = 10 * n + 1;
        let trend = (1.5 * period as f64 / (1.0 - 1.5 / seasonal_window as f64)).ceil() as usize;
        Self {
            period,
            seasonal_window,
            trend_window: next_odd(trend),
            lowpass_window: next_odd(period),
        }
    }
}

fn next_odd(x: usize) -> usize {
    if x % 2 == 0 { x + 1 } else { x }
}

#[derive(Debug, Clone)]
pub struct Decomposition {
    pub period: usize,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub remainder: Vec<f64>,
}

impl Decomposition {
    /// `max(0, 1 - var(R) / var(S + R))`.
    pub fn seasonal_strength(&self) -> f64 {
        let detrended: Vec<f64> = self
            .seasonal
            .iter()
            .zip(&self.remainder)
            .map(|(s, r)| s + r)
            .collect();
        let denom = variance(&detrended);
        if denom <= 0.0 {
            return 0.0;
        }
        (1.0 - variance(&self.remainder) / denom).max(0.0)
    }

    /// Peak-to-trough half range of the seasonal component.
    pub fn seasonal_amplitude(&self) -> f64 {
        half_range(&self.seasonal)
    }
}

pub(crate) fn half_range(values: &[f64]) -> f64 {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() { (hi - lo) / 2.0 } else { 0.0 }
}

fn variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

/// Periodic STL decomposition of `x`.
pub fn stl_periodic(x: &[f64], period: usize) -> Result<Decomposition, AppError> {
    let n = x.len();
    if period < 2 || n <= 2 * period {
        return Err(AppError::Stats(format!(
            "STL needs more than two full periods (n={n}, period={period})."
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Stats("STL input contains non-finite values.".into()));
    }

    let config = StlConfig::periodic(period, n);
    let mut trend = vec![0.0; n];
    let mut seasonal = vec![0.0; n];

    for _ in 0..INNER_PASSES {
        let detrended: Vec<f64> = x.iter().zip(&trend).map(|(y, t)| y - t).collect();
        let cycle = cycle_subseries_smooth(&detrended, &config);
        let lowpass = loess(&low_pass_filter(&cycle, period), config.lowpass_window, 1);
        for i in 0..n {
            seasonal[i] = cycle[period + i] - lowpass[i];
        }
        let deseasonalized: Vec<f64> = x.iter().zip(&seasonal).map(|(y, s)| y - s).collect();
        trend = loess(&deseasonalized, config.trend_window, 1);
    }

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, s) in seasonal.iter().enumerate() {
        sums[i % period] += s;
        counts[i % period] += 1;
    }
    let seasonal: Vec<f64> = (0..n)
        .map(|i| sums[i % period] / counts[i % period] as f64)
        .collect();
    let remainder = (0..n).map(|i| x[i] - seasonal[i] - trend[i]).collect();

    Ok(Decomposition {
        period,
        trend,
        seasonal,
        remainder,
    })
}

/// Smooth each cycle-subseries and extend it by one value at each end.
///
/// The output has length `n + 2 * period`; index `period + i` lines up with `x[i]`.
fn cycle_subseries_smooth(x: &[f64], config: &StlConfig) -> Vec<f64> {
    let n = x.len();
    let np = config.period;
    let ns = config.seasonal_window;
    let mut out = vec![0.0; n + 2 * np];

    for j in 0..np {
        let sub: Vec<f64> = x.iter().skip(j).step_by(np).copied().collect();
        let k = sub.len();
        let smooth = loess(&sub, ns, 0);

        let before = loess_at(&sub, ns, 0, 0.0, 1, ns.min(k)).unwrap_or(smooth[0]);
        let after =
            loess_at(&sub, ns, 0, (k + 1) as f64, (k + 1).saturating_sub(ns).max(1), k)
                .unwrap_or(smooth[k - 1]);

        out[j] = before;
        for (m, v) in smooth.iter().enumerate() {
            out[(m + 1) * np + j] = *v;
        }
        out[(k + 1) * np + j] = after;
    }
    out
}

/// Moving averages of length `period`, `period`, then 3.
fn low_pass_filter(x: &[f64], period: usize) -> Vec<f64> {
    moving_average(&moving_average(&moving_average(x, period), period), 3)
}

fn moving_average(x: &[f64], len: usize) -> Vec<f64> {
    if len == 0 || x.len() < len {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(x.len() - len + 1);
    let mut sum: f64 = x[..len].iter().sum();
    out.push(sum / len as f64);
    for i in len..x.len() {
        sum += x[i] - x[i - len];
        out.push(sum / len as f64);
    }
    out
}

/// Loess smooth evaluated at every index (1-based positions `1..=n`).
fn loess(y: &[f64], len: usize, degree: usize) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return y.to_vec();
    }
    let mut out = vec![0.0; n];
    if len >= n {
        for i in 1..=n {
            out[i - 1] = loess_at(y, len, degree, i as f64, 1, n).unwrap_or(y[i - 1]);
        }
        return out;
    }

    let half = (len + 1) / 2;
    let (mut left, mut right) = (1usize, len);
    for i in 1..=n {
        if i > half && right != n {
            left += 1;
            right += 1;
        }
        out[i - 1] = loess_at(y, len, degree, i as f64, left, right).unwrap_or(y[i - 1]);
    }
    out
}

/// Tricube-weighted local fit of degree 0 or 1 at position `xs`, using the
/// 1-based neighbourhood `left..=right`. `None` when every weight vanishes.
fn loess_at(y: &[f64], len: usize, degree: usize, xs: f64, left: usize, right: usize) -> Option<f64> {
    let n = y.len();
    let range = n as f64 - 1.0;
    let mut h = (xs - left as f64).max(right as f64 - xs);
    if len > n {
        h += ((len - n) / 2) as f64;
    }
    let h9 = 0.999 * h;
    let h1 = 0.001 * h;

    let mut weights = vec![0.0; right + 1 - left];
    let mut total = 0.0;
    for (w, j) in weights.iter_mut().zip(left..=right) {
        let r = (j as f64 - xs).abs();
        if r <= h9 {
            *w = if r <= h1 { 1.0 } else { (1.0 - (r / h).powi(3)).powi(3) };
            total += *w;
        }
    }
    if total <= 0.0 {
        return None;
    }
    for w in weights.iter_mut() {
        *w /= total;
    }

    if h > 0.0 && degree > 0 {
        let a: f64 = weights.iter().zip(left..=right).map(|(w, j)| w * j as f64).sum();
        let c: f64 = weights
            .iter()
            .zip(left..=right)
            .map(|(w, j)| w * (j as f64 - a).powi(2))
            .sum();
        if c.sqrt() > 0.001 * range {
            let b = (xs - a) / c;
            for (w, j) in weights.iter_mut().zip(left..=right) {
                *w *= b * (j as f64 - a) + 1.0;
            }
        }
    }

    Some(weights.iter().zip(left..=right).map(|(w, j)| w * y[j - 1]).sum())
}
