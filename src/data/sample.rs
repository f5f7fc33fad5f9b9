//! Synthetic monthly price generation.
//!
//! Log prices follow a jump-diffusion random walk with a multiplicative
//! month-of-year effect, which gives an NVDA-like fixture: strong growth,
//! fat tails and a mild seasonal pattern. Output is fully determined by the seed.

use chrono::{Datelike, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::provider::{PriceProvider, PriceRequest, ProviderRow};
use crate::domain::{PriceObservation, YearMonth};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub start: YearMonth,
    pub months: usize,
    pub seed: u64,
    /// First price.
    pub initial: f64,
    /// Mean monthly log return.
    pub drift: f64,
    /// Monthly log-return standard deviation.
    pub volatility: f64,
    /// Relative size of the month-of-year effect.
    pub seasonal_amplitude: f64,
    /// Probability of a jump in each direction per month.
    pub jump_prob: f64,
    /// Jump size in units of `volatility`.
    pub jump_k: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            start: YearMonth { year: 2015, month: 1 },
            months: 120,
            seed: 42,
            initial: 20.0,
            drift: 0.035,
            volatility: 0.12,
            seasonal_amplitude: 0.04,
            jump_prob: 0.03,
            jump_k: 2.5,
        }
    }
}

impl SampleConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.months == 0 {
            return Err(AppError::Config("Sample length must be > 0 months.".into()));
        }
        if !(self.initial.is_finite() && self.initial > 0.0) {
            return Err(AppError::Config("Initial price must be positive.".into()));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0 && self.drift.is_finite()) {
            return Err(AppError::Config("Invalid drift/volatility settings.".into()));
        }
        if !(0.0..0.5).contains(&self.jump_prob) || !(self.jump_k.is_finite() && self.jump_k >= 0.0) {
            return Err(AppError::Config("Invalid jump settings.".into()));
        }
        if !(0.0..1.0).contains(&self.seasonal_amplitude) {
            return Err(AppError::Config("Seasonal amplitude must be in [0, 1).".into()));
        }
        Ok(())
    }
}

fn seasonal_factor(month: u32, amplitude: f64) -> f64 {
    let angle = 2.0 * std::f64::consts::PI * (month as f64 - 1.0) / 12.0;
    1.0 + amplitude * angle.sin()
}

/// Generate `config.months` consecutive month-start observations.
pub fn generate_prices(config: &SampleConfig) -> Result<Vec<PriceObservation>, AppError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::Config(format!("Noise distribution error: {e}")))?;

    // Keeps E[exp(jump)] neutral so `drift` stays the mean log growth.
    let jump = config.jump_k * config.volatility;
    let correction = config.jump_prob * (jump.exp() + (-jump).exp() - 2.0);

    let mut out = Vec::with_capacity(config.months);
    let mut log_level = config.initial.ln();
    for i in 0..config.months {
        let month = config.start.offset(i as i64);
        if i > 0 {
            let z: f64 = normal.sample(&mut rng);
            let roll: f64 = rng.r#gen();
            let shock = if roll < config.jump_prob {
                jump
            } else if roll < 2.0 * config.jump_prob {
                -jump
            } else {
                0.0
            };
            log_level += config.drift + config.volatility * z + shock - correction;
        }
        let date = month
            .first_day()
            .ok_or_else(|| AppError::Config(format!("Invalid sample month {month}.")))?;
        out.push(PriceObservation {
            date,
            adjusted_close: log_level.exp() * seasonal_factor(month.month, config.seasonal_amplitude),
        });
    }
    Ok(out)
}

/// Offline provider backed by [`generate_prices`]; the request decides the range.
#[derive(Debug, Clone, Default)]
pub struct SampleProvider {
    pub config: SampleConfig,
}

fn months_covering(start: NaiveDate, end: NaiveDate) -> usize {
    let first = YearMonth::from_date(start);
    let last = YearMonth::from_date(end);
    let extra = i64::from(end.day() > 1);
    usize::try_from(first.months_until(last) + extra).unwrap_or(0)
}

impl PriceProvider for SampleProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &PriceRequest) -> Result<Vec<ProviderRow>, AppError> {
        let config = SampleConfig {
            start: YearMonth::from_date(request.start),
            months: months_covering(request.start, request.end),
            ..self.config.clone()
        };
        let rows = generate_prices(&config)?
            .into_iter()
            .map(|o| ProviderRow {
                date: o.date,
                close: Some(o.adjusted_close),
                adjusted_close: Some(o.adjusted_close),
                ..ProviderRow::default()
            })
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_and_positive() {
        let config = SampleConfig::default();
        let a = generate_prices(&config).unwrap();
        let b = generate_prices(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 120);
        assert!(a.iter().all(|o| o.adjusted_close > 0.0));
        assert_eq!(a[0].date, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(a[119].date, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert!((a[0].adjusted_close - 20.0).abs() < 1e-12);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_prices(&SampleConfig::default()).unwrap();
        let b = generate_prices(&SampleConfig {
            seed: 7,
            ..SampleConfig::default()
        })
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = SampleConfig {
            initial: -1.0,
            ..SampleConfig::default()
        };
        assert!(matches!(generate_prices(&bad), Err(AppError::Config(_))));
    }

    #[test]
    fn provider_covers_request_range() {
        let request = PriceRequest::new(
            "NVDA",
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .unwrap();
        let rows = SampleProvider::default().fetch(&request).unwrap();
        assert_eq!(rows.len(), 120);
        assert_eq!(months_covering(request.start, NaiveDate::from_ymd_opt(2015, 3, 15).unwrap()), 3);
    }
}
