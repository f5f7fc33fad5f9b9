//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built once per run from the provider response
//! - passed by reference through the statistics and model code
//! - exported to CSV/JSON at the end of the run

use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Monthly frequency used by every series in this crate.
pub const MONTHLY: usize = 12;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Config(format!("Invalid month {month} (expected 1..=12).")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month index counted from year 0, used for arithmetic.
    fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Shift by `months` (may be negative).
    pub fn offset(self, months: i64) -> Self {
        let total = self.ordinal() + months;
        Self {
            year: total.div_euclid(12) as i32,
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(self, other: YearMonth) -> i64 {
        other.ordinal() - self.ordinal()
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One cleaned monthly price (month-start date, adjusted close).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub adjusted_close: f64,
}

/// Fixed-frequency numeric series anchored at a start month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    start: YearMonth,
    frequency: usize,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(start: YearMonth, frequency: usize, values: Vec<f64>) -> Self {
        Self {
            start,
            frequency: frequency.max(1),
            values,
        }
    }

    pub fn monthly(start: YearMonth, values: Vec<f64>) -> Self {
        Self::new(start, MONTHLY, values)
    }

    /// Build a monthly series from cleaned observations.
    ///
    /// Observations must be ascending with exactly one entry per calendar month.
    pub fn from_observations(observations: &[PriceObservation]) -> Result<Self, AppError> {
        let first = observations
            .first()
            .ok_or_else(|| AppError::DataUnavailable("No observations to build a series from.".into()))?;
        let start = YearMonth::from_date(first.date);

        for (i, obs) in observations.iter().enumerate() {
            let expected = start.offset(i as i64);
            let got = YearMonth::from_date(obs.date);
            if got != expected {
                return Err(AppError::DataUnavailable(format!(
                    "Series is not contiguous: expected {expected}, found {got}."
                )));
            }
        }

        Ok(Self::monthly(
            start,
            observations.iter().map(|o| o.adjusted_close).collect(),
        ))
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    /// Period of the last value. For an empty series this is the period before `start`.
    pub fn end(&self) -> YearMonth {
        self.start.offset(self.values.len() as i64 - 1)
    }

    pub fn frequency(&self) -> usize {
        self.frequency
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn period_of(&self, index: usize) -> YearMonth {
        self.start.offset(index as i64)
    }

    pub fn dates(&self) -> Vec<YearMonth> {
        (0..self.values.len()).map(|i| self.period_of(i)).collect()
    }

    /// First difference; the result starts one period later and is one shorter.
    pub fn diff(&self) -> TimeSeries {
        let values = self.values.windows(2).map(|w| w[1] - w[0]).collect();
        TimeSeries::new(self.start.offset(1), self.frequency, values)
    }

    /// Inverse of [`TimeSeries::diff`]: cumulative sum seeded with `first`.
    pub fn integrate(&self, first: f64) -> TimeSeries {
        let mut values = Vec::with_capacity(self.values.len() + 1);
        let mut acc = first;
        values.push(acc);
        for d in &self.values {
            acc += d;
            values.push(acc);
        }
        TimeSeries::new(self.start.offset(-1), self.frequency, values)
    }

    /// Sub-series covering indices `[from, to)`.
    pub fn slice(&self, from: usize, to: usize) -> TimeSeries {
        let to = to.min(self.values.len());
        let from = from.min(to);
        TimeSeries::new(
            self.start.offset(from as i64),
            self.frequency,
            self.values[from..to].to_vec(),
        )
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &self.values {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
    }
}

/// Time-ordered train/test partition of a series.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: TimeSeries,
    pub test: TimeSeries,
}

impl Split {
    /// Split off the last `horizon` observations as the test window.
    pub fn new(series: &TimeSeries, horizon: usize) -> Result<Self, AppError> {
        let n = series.len();
        if horizon == 0 || horizon >= n {
            return Err(AppError::Config(format!(
                "Horizon must satisfy 0 < h < n (h={horizon}, n={n})."
            )));
        }
        let cut = n - horizon;
        let split = Split {
            train: series.slice(0, cut),
            test: series.slice(cut, n),
        };
        split.check(n)?;
        Ok(split)
    }

    /// Verify `len(train) + len(test) == total` and that test follows train directly.
    pub fn check(&self, total: usize) -> Result<(), AppError> {
        let (train, test) = (self.train.len(), self.test.len());
        if train + test != total || self.train.end().offset(1) != self.test.start() {
            return Err(AppError::SplitInvariant { train, test, total });
        }
        Ok(())
    }
}

/// Candidate models, in fitting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    MovingAverage,
    LinearTrend,
    EtsSimple,
    EtsHolt,
    EtsHoltWintersAdditive,
    EtsHoltWintersMultiplicative,
    Arima,
}

impl ModelKind {
    pub const ALL: [ModelKind; 7] = [
        ModelKind::MovingAverage,
        ModelKind::LinearTrend,
        ModelKind::EtsSimple,
        ModelKind::EtsHolt,
        ModelKind::EtsHoltWintersAdditive,
        ModelKind::EtsHoltWintersMultiplicative,
        ModelKind::Arima,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::MovingAverage => "Moving Average",
            ModelKind::LinearTrend => "Linear Regression",
            ModelKind::EtsSimple => "ETS Simple",
            ModelKind::EtsHolt => "ETS Holt",
            ModelKind::EtsHoltWintersAdditive => "HW Additive",
            ModelKind::EtsHoltWintersMultiplicative => "HW Multiplicative",
            ModelKind::Arima => "ARIMA",
        }
    }

    /// Whether the model has a likelihood (and therefore AIC/BIC).
    pub fn has_likelihood(self) -> bool {
        !matches!(self, ModelKind::MovingAverage | ModelKind::LinearTrend)
    }
}

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub model: ModelKind,
    pub rmse: Option<f64>,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
}

/// ARIMA order search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchPolicy {
    /// Hyndman-Khandakar neighbourhood search.
    Stepwise,
    /// Every order within the configured bounds.
    Exhaustive,
}

/// Resolved configuration for a single `tf run`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Test window length (h).
    pub horizon: usize,
    pub ma_window: usize,
    pub seasonal_period: usize,
    /// ACF/PACF lags; `None` picks `10 * log10(n)`.
    pub lags: Option<usize>,
    pub search: SearchPolicy,
    /// Read prices from a CSV file instead of the network provider.
    pub input: Option<PathBuf>,
    /// Generate prices offline with this seed instead of fetching them.
    pub synthetic_seed: Option<u64>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_table: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            symbol: "NVDA".to_string(),
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            horizon: 30,
            ma_window: 10,
            seasonal_period: MONTHLY,
            lags: None,
            search: SearchPolicy::Stepwise,
            input: None,
            synthetic_seed: None,
            plot: true,
            plot_width: 100,
            plot_height: 25,
            export_table: None,
            export_json: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn year_month_offset_wraps_years() {
        assert_eq!(ym(2015, 1).offset(11), ym(2015, 12));
        assert_eq!(ym(2015, 1).offset(12), ym(2016, 1));
        assert_eq!(ym(2015, 1).offset(-1), ym(2014, 12));
        assert_eq!(ym(2015, 3).months_until(ym(2016, 2)), 11);
        assert_eq!(ym(2015, 3).to_string(), "2015-03");
    }

    #[test]
    fn diff_then_integrate_round_trips() {
        let x = TimeSeries::monthly(ym(2015, 1), vec![3.0, 5.5, 4.25, 10.0, -2.0, 7.75]);
        let d = x.diff();
        assert_eq!(d.len(), x.len() - 1);
        assert_eq!(d.start(), ym(2015, 2));

        let back = d.integrate(x.values()[0]);
        assert_eq!(back.start(), x.start());
        assert_eq!(back.len(), x.len());
        for (a, b) in back.values().iter().zip(x.values()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn split_partitions_series_without_gap_or_overlap() {
        for n in [2usize, 31, 60, 120] {
            let x = TimeSeries::monthly(ym(2015, 1), (0..n).map(|i| i as f64).collect());
            for h in [1usize, n / 2, n - 1] {
                if h == 0 {
                    continue;
                }
                let split = Split::new(&x, h).unwrap();
                assert_eq!(split.train.len() + split.test.len(), n);
                assert_eq!(split.test.len(), h);
                assert_eq!(split.train.end().offset(1), split.test.start());
                let mut joined = split.train.values().to_vec();
                joined.extend_from_slice(split.test.values());
                assert_eq!(joined, x.values());
            }
        }
    }

    #[test]
    fn split_rejects_horizon_out_of_range() {
        let x = TimeSeries::monthly(ym(2015, 1), vec![1.0; 10]);
        assert!(matches!(Split::new(&x, 0), Err(AppError::Config(_))));
        assert!(matches!(Split::new(&x, 10), Err(AppError::Config(_))));
    }

    #[test]
    fn split_check_flags_length_mismatch() {
        let x = TimeSeries::monthly(ym(2015, 1), vec![1.0; 10]);
        let split = Split::new(&x, 3).unwrap();
        let err = split.check(11).unwrap_err();
        assert!(matches!(
            err,
            AppError::SplitInvariant { train: 7, test: 3, total: 11 }
        ));
    }

    #[test]
    fn from_observations_rejects_gaps() {
        let obs = [
            PriceObservation { date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(), adjusted_close: 1.0 },
            PriceObservation { date: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(), adjusted_close: 2.0 },
        ];
        assert!(matches!(
            TimeSeries::from_observations(&obs),
            Err(AppError::DataUnavailable(_))
        ));
    }
}
