//! Automatic ARIMA order selection.
//!
//! 1. Seasonal differencing `D` (0 or 1) from the STL seasonal strength.
//! 2. Non-seasonal differencing `d` by repeated KPSS level tests.
//! 3. `(p, q, P, Q, constant)` by AICc, either stepwise (Hyndman-Khandakar
//!    neighbourhood moves from four start models) or exhaustively.

use std::collections::HashSet;

use crate::domain::{ModelKind, SearchPolicy, TimeSeries};
use crate::error::AppError;
use crate::models::arima::difference;
use crate::models::{ArimaOrder, ArimaSpec, FittedModel, SeasonalOrder, fit_arima};
use crate::stats::{DEFAULT_ALPHA, KpssNull, SEASONAL_STRENGTH_THRESHOLD, kpss_test, stl_periodic};

#[derive(Debug, Clone, Copy)]
pub struct AutoArimaConfig {
    pub period: usize,
    pub policy: SearchPolicy,
    pub max_p: usize,
    pub max_q: usize,
    pub max_seasonal_p: usize,
    pub max_seasonal_q: usize,
    pub max_d: usize,
    pub max_seasonal_d: usize,
    /// Bound on `p + q + P + Q` for the exhaustive search.
    pub max_order: usize,
    /// Bound on fitted candidates for the stepwise search.
    pub max_models: usize,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            period: crate::domain::MONTHLY,
            policy: SearchPolicy::Stepwise,
            max_p: 5,
            max_q: 5,
            max_seasonal_p: 2,
            max_seasonal_q: 2,
            max_d: 2,
            max_seasonal_d: 1,
            max_order: 5,
            max_models: 94,
        }
    }
}

/// Differencing orders chosen before the order search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Differencing {
    pub d: usize,
    pub seasonal_d: usize,
    /// STL seasonal strength of the input, when it could be computed.
    pub seasonal_strength: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ArimaSelection {
    pub best: FittedModel,
    pub spec: ArimaSpec,
    pub differencing: Differencing,
    /// Number of candidate orders fitted.
    pub models_tried: usize,
}

/// Pick `D` from seasonal strength, then `d` by KPSS on the seasonally differenced series.
pub fn choose_differencing(x: &[f64], config: &AutoArimaConfig) -> Differencing {
    let mut seasonal_d = 0;
    let mut seasonal_strength = None;
    if config.period > 1 && config.max_seasonal_d > 0 {
        match stl_periodic(x, config.period) {
            Ok(stl) => {
                let strength = stl.seasonal_strength();
                seasonal_strength = Some(strength);
                if strength > SEASONAL_STRENGTH_THRESHOLD {
                    seasonal_d = 1;
                }
            }
            Err(err) => tracing::debug!(error = %err, "no seasonal strength; D = 0"),
        }
    }

    let mut w = if seasonal_d == 1 {
        difference(x, config.period)
    } else {
        x.to_vec()
    };
    let mut d = 0;
    while d < config.max_d {
        match kpss_test(&w, KpssNull::Level) {
            Ok(kpss) if kpss.p_value < DEFAULT_ALPHA => {
                w = difference(&w, 1);
                d += 1;
            }
            Ok(_) => break,
            Err(err) => {
                tracing::debug!(error = %err, d, "KPSS failed; stop differencing");
                break;
            }
        }
    }

    Differencing {
        d,
        seasonal_d,
        seasonal_strength,
    }
}

struct Search<'a> {
    series: &'a TimeSeries,
    config: &'a AutoArimaConfig,
    d: usize,
    seasonal_d: usize,
    visited: HashSet<ArimaSpec>,
    best: Option<(f64, ArimaSpec, FittedModel)>,
}

impl<'a> Search<'a> {
    fn spec(&self, p: usize, q: usize, sp: usize, sq: usize, constant: bool) -> ArimaSpec {
        let seasonal = if self.config.period > 1 {
            SeasonalOrder {
                p: sp,
                d: self.seasonal_d,
                q: sq,
                period: self.config.period,
            }
        } else {
            SeasonalOrder::default()
        };
        ArimaSpec::new(ArimaOrder { p, d: self.d, q }, seasonal, constant)
    }

    fn constant_allowed(&self) -> bool {
        self.d + self.seasonal_d <= 1
    }

    fn within_bounds(&self, spec: &ArimaSpec) -> bool {
        let c = self.config;
        let seasonal_ok = if c.period > 1 {
            spec.seasonal.p <= c.max_seasonal_p && spec.seasonal.q <= c.max_seasonal_q
        } else {
            spec.seasonal.p == 0 && spec.seasonal.q == 0
        };
        spec.order.p <= c.max_p
            && spec.order.q <= c.max_q
            && seasonal_ok
            && (!spec.include_constant || self.constant_allowed())
    }

    /// Fit `spec` unless seen before; returns `true` when it became the best.
    fn try_spec(&mut self, spec: ArimaSpec) -> bool {
        if !self.within_bounds(&spec) || !self.visited.insert(spec) {
            return false;
        }
        let fit = match fit_arima(self.series, &spec) {
            Ok(fit) => fit,
            Err(err) => {
                tracing::debug!(model = %spec.label(), error = %err, "candidate rejected");
                return false;
            }
        };
        let Some(aicc) = fit.criteria.map(|c| c.aicc).filter(|v| v.is_finite()) else {
            return false;
        };
        let improves = self.best.as_ref().is_none_or(|(best, _, _)| aicc < *best);
        if improves {
            self.best = Some((aicc, spec, fit));
        }
        improves
    }

    fn run_stepwise(&mut self) {
        let constant = self.constant_allowed();
        let starts = [
            (2, 2, 1, 1, constant),
            (0, 0, 0, 0, constant),
            (1, 0, 1, 0, constant),
            (0, 1, 0, 1, constant),
        ];
        for (p, q, sp, sq, c) in starts {
            let spec = self.spec(p, q, sp, sq, c);
            self.try_spec(spec);
        }
        if constant {
            let spec = self.spec(0, 0, 0, 0, false);
            self.try_spec(spec);
        }

        // (dp, dq, dP, dQ, toggle constant)
        const MOVES: [(i32, i32, i32, i32, bool); 17] = [
            (0, 0, -1, 0, false),
            (0, 0, 1, 0, false),
            (0, 0, 0, -1, false),
            (0, 0, 0, 1, false),
            (0, 0, -1, -1, false),
            (0, 0, -1, 1, false),
            (0, 0, 1, -1, false),
            (0, 0, 1, 1, false),
            (-1, 0, 0, 0, false),
            (1, 0, 0, 0, false),
            (0, -1, 0, 0, false),
            (0, 1, 0, 0, false),
            (-1, -1, 0, 0, false),
            (1, -1, 0, 0, false),
            (-1, 1, 0, 0, false),
            (1, 1, 0, 0, false),
            (0, 0, 0, 0, true),
        ];

        'outer: loop {
            let Some((_, current, _)) = self.best.as_ref() else {
                return;
            };
            let current = *current;
            for (dp, dq, dsp, dsq, toggle) in MOVES {
                if self.visited.len() >= self.config.max_models {
                    tracing::debug!(models = self.visited.len(), "stepwise search hit model cap");
                    return;
                }
                let step = |v: usize, dv: i32| usize::try_from(v as i64 + dv as i64).ok();
                let (Some(p), Some(q), Some(sp), Some(sq)) = (
                    step(current.order.p, dp),
                    step(current.order.q, dq),
                    step(current.seasonal.p, dsp),
                    step(current.seasonal.q, dsq),
                ) else {
                    continue;
                };
                let constant = current.include_constant ^ toggle;
                let candidate = self.spec(p, q, sp, sq, constant);
                if self.try_spec(candidate) {
                    continue 'outer;
                }
            }
            return;
        }
    }

    fn run_exhaustive(&mut self) {
        let c = *self.config;
        let (max_sp, max_sq) = if c.period > 1 {
            (c.max_seasonal_p, c.max_seasonal_q)
        } else {
            (0, 0)
        };
        let constants: &[bool] = if self.constant_allowed() { &[true, false] } else { &[false] };
        for p in 0..=c.max_p {
            for q in 0..=c.max_q {
                for sp in 0..=max_sp {
                    for sq in 0..=max_sq {
                        if p + q + sp + sq > c.max_order {
                            continue;
                        }
                        for &constant in constants {
                            let spec = self.spec(p, q, sp, sq, constant);
                            self.try_spec(spec);
                        }
                    }
                }
            }
        }
    }
}

/// Select and fit the ARIMA order with the lowest AICc.
pub fn auto_arima(series: &TimeSeries, config: &AutoArimaConfig) -> Result<ArimaSelection, AppError> {
    let differencing = choose_differencing(series.values(), config);
    let mut search = Search {
        series,
        config,
        d: differencing.d,
        seasonal_d: differencing.seasonal_d,
        visited: HashSet::new(),
        best: None,
    };

    match config.policy {
        SearchPolicy::Stepwise => search.run_stepwise(),
        SearchPolicy::Exhaustive => search.run_exhaustive(),
    }

    let models_tried = search.visited.len();
    let Some((aicc, spec, best)) = search.best else {
        return Err(AppError::model_fit(
            ModelKind::Arima,
            format!("no admissible order among {models_tried} candidates"),
        ));
    };

    tracing::info!(
        order = %spec.label(),
        aicc,
        models_tried,
        seasonal_strength = ?differencing.seasonal_strength,
        "ARIMA order selected"
    );

    Ok(ArimaSelection {
        best,
        spec,
        differencing,
        models_tried,
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

    fn seasonal_series(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.5).unwrap();
        (0..n)
            .map(|t| {
                let angle = 2.0 * std::f64::consts::PI * t as f64 / 12.0;
                50.0 + 0.5 * t as f64 + 10.0 * angle.sin() + noise.sample(&mut rng)
            })
            .collect()
    }

    #[test]
    fn trending_series_is_differenced_once() {
        let x: Vec<f64> = (0..120)
            .map(|t| t as f64 + if t % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let config = AutoArimaConfig {
            period: 1,
            ..AutoArimaConfig::default()
        };
        let diff = choose_differencing(&x, &config);
        assert_eq!(diff.d, 1);
        assert_eq!(diff.seasonal_d, 0);
        assert!(diff.seasonal_strength.is_none());
    }

    #[test]
    fn strong_seasonality_takes_seasonal_difference() {
        let diff = choose_differencing(&seasonal_series(96, 5), &AutoArimaConfig::default());
        assert_eq!(diff.seasonal_d, 1);
        assert!(diff.seasonal_strength.unwrap() > SEASONAL_STRENGTH_THRESHOLD);
    }

    #[test]
    fn stepwise_search_forecasts_seasonal_pattern() {
        let n = 96;
        let x = seasonal_series(n, 9);
        let selection = auto_arima(&monthly(x), &AutoArimaConfig::default()).unwrap();

        assert_eq!(selection.spec.seasonal.d, 1);
        assert!(selection.models_tried >= 4);
        assert!(selection.models_tried <= 94);

        let fc = selection.best.forecast(12);
        for (k, f) in fc.iter().enumerate() {
            let t = (n + k) as f64;
            let truth = 50.0 + 0.5 * t + 10.0 * (2.0 * std::f64::consts::PI * t / 12.0).sin();
            assert!((f - truth).abs() < 3.0, "step {k}: {f} vs {truth}");
        }
    }

    #[test]
    fn exhaustive_search_visits_every_order_in_bounds() {
        let mut rng = StdRng::seed_from_u64(13);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![10.0];
        for _ in 1..150 {
            let prev = *x.last().unwrap();
            x.push(10.0 + 0.5 * (prev - 10.0) + normal.sample(&mut rng));
        }
        let config = AutoArimaConfig {
            period: 1,
            policy: SearchPolicy::Exhaustive,
            max_p: 1,
            max_q: 1,
            max_d: 0,
            ..AutoArimaConfig::default()
        };
        let selection = auto_arima(&monthly(x), &config).unwrap();
        assert_eq!(selection.differencing.d, 0);
        // 2 x 2 orders, each with and without a mean.
        assert_eq!(selection.models_tried, 8);
        assert!(selection.spec.order.p == 1 || selection.spec.order.q == 1);
    }

    #[test]
    fn exhaustive_search_under_default_bounds_reaches_high_orders() {
        let mut rng = StdRng::seed_from_u64(31);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![10.0, 10.0];
        for _ in 2..120 {
            let n = x.len();
            x.push(10.0 + 0.5 * (x[n - 1] - 10.0) - 0.3 * (x[n - 2] - 10.0) + normal.sample(&mut rng));
        }
        let config = AutoArimaConfig {
            period: 1,
            policy: SearchPolicy::Exhaustive,
            max_d: 0,
            ..AutoArimaConfig::default()
        };
        assert_eq!((config.max_p, config.max_q, config.max_order), (5, 5, 5));

        let selection = auto_arima(&monthly(x), &config).unwrap();
        // 21 (p, q) pairs with p + q <= 5, each with and without a mean.
        assert_eq!(selection.models_tried, 42);
        let order = selection.spec.order;
        assert!(order.p + order.q <= 5);
        assert!(selection.best.forecast(6).iter().all(|v| v.is_finite()));
    }
}
