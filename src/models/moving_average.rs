//! Centred moving average.
//!
//! Odd windows average `w` neighbours symmetrically. Even windows use the
//! classical `2 x w` average (weights `1/2w, 1/w, ..., 1/w, 1/2w` over `w + 1`
//! points) so the result stays centred. The first and last `w / 2` points are
//! undefined either way.

use crate::domain::{ModelKind, TimeSeries};
use crate::error::AppError;
use crate::models::model::{FittedModel, ModelState};

#[derive(Debug, Clone, Copy)]
pub struct MovingAverageSpec {
    pub window: usize,
}

impl Default for MovingAverageSpec {
    fn default() -> Self {
        Self { window: 10 }
    }
}

/// Centred moving average of `x`; `None` where the window does not fit.
pub fn centered_moving_average(x: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = x.len();
    let half = window / 2;
    let mut out = vec![None; n];
    if window == 0 || n < 2 * half + 1 {
        return out;
    }

    let w = window as f64;
    for (t, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
        let value = if window % 2 == 1 {
            x[t - half..=t + half].iter().sum::<f64>() / w
        } else {
            let inner: f64 = x[t + 1 - half..t + half].iter().sum();
            (0.5 * x[t - half] + inner + 0.5 * x[t + half]) / w
        };
        *slot = Some(value);
    }
    out
}

pub fn fit_moving_average(series: &TimeSeries, spec: MovingAverageSpec) -> Result<FittedModel, AppError> {
    let kind = ModelKind::MovingAverage;
    if spec.window == 0 {
        return Err(AppError::model_fit(kind, "window must be > 0"));
    }

    let fitted = centered_moving_average(series.values(), spec.window);
    let last = fitted
        .iter()
        .rev()
        .find_map(|v| *v)
        .ok_or_else(|| {
            AppError::model_fit(
                kind,
                format!("window {} is too wide for n={}", spec.window, series.len()),
            )
        })?;

    Ok(FittedModel {
        kind,
        label: format!("MA({})", spec.window),
        fitted,
        criteria: None,
        state: ModelState::MovingAverage { last },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YearMonth;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn odd_window_is_plain_centred_mean() {
        let ma = centered_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(ma, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn even_window_uses_two_by_w_weights() {
        let x: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let ma = centered_moving_average(&x, 10);
        assert_eq!(ma.iter().filter(|v| v.is_none()).count(), 10);
        assert!(ma[..5].iter().all(Option::is_none));
        assert!(ma[7..].iter().all(Option::is_none));
        // Linear input: a symmetric filter returns the centre value.
        assert!((ma[5].unwrap() - 6.0).abs() < 1e-12);
        assert!((ma[6].unwrap() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn smoothing_reduces_noise_variance() {
        let mut rng = StdRng::seed_from_u64(3);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let x: Vec<f64> = (0..120).map(|t| 0.1 * t as f64 + normal.sample(&mut rng)).collect();
        let ma: Vec<f64> = centered_moving_average(&x, 10).into_iter().flatten().collect();

        let noise_var = |v: &[f64], base: &[f64]| {
            let d: Vec<f64> = v.iter().zip(base).map(|(a, b)| a - b).collect();
            let m = d.iter().sum::<f64>() / d.len() as f64;
            d.iter().map(|e| (e - m).powi(2)).sum::<f64>() / d.len() as f64
        };
        let trend_mid: Vec<f64> = (5..115).map(|t| 0.1 * t as f64).collect();
        let trend_all: Vec<f64> = (0..120).map(|t| 0.1 * t as f64).collect();
        assert!(noise_var(&ma, &trend_mid) < noise_var(&x, &trend_all));
    }

    #[test]
    fn fit_forecasts_last_defined_value() {
        let series = TimeSeries::monthly(YearMonth::new(2015, 1).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let fit = fit_moving_average(&series, MovingAverageSpec { window: 3 }).unwrap();
        assert_eq!(fit.forecast(2), vec![4.0, 4.0]);
        assert!(fit.criteria.is_none());
    }

    #[test]
    fn window_wider_than_series_fails() {
        let series = TimeSeries::monthly(YearMonth::new(2015, 1).unwrap(), vec![1.0; 5]);
        assert!(matches!(
            fit_moving_average(&series, MovingAverageSpec { window: 10 }),
            Err(AppError::ModelFit { .. })
        ));
    }
}
