//! Market-data provider abstraction and row cleaning.
//!
//! Providers return raw daily/monthly rows; [`clean_observations`] turns them
//! into one adjusted close per calendar month inside the requested range.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{PriceObservation, RunConfig, TimeSeries, YearMonth};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Monthly,
}

impl Interval {
    /// Query value understood by chart-style endpoints.
    pub fn as_query(self) -> &'static str {
        match self {
            Interval::Monthly => "1mo",
        }
    }
}

/// What to load: `start <= date < end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
}

impl PriceRequest {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AppError::Config("Symbol must not be empty.".into()));
        }
        if start >= end {
            return Err(AppError::Config(format!(
                "Start date {start} must be before end date {end}."
            )));
        }
        Ok(Self {
            symbol,
            start,
            end,
            interval: Interval::Monthly,
        })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, AppError> {
        Self::new(config.symbol.clone(), config.start, config.end)
    }
}

/// One provider row; every numeric field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub adjusted_close: Option<f64>,
}

/// A source of historical prices.
pub trait PriceProvider {
    fn name(&self) -> &str;

    fn fetch(&self, request: &PriceRequest) -> Result<Vec<ProviderRow>, AppError>;
}

/// Drop unusable rows, normalise to month starts and keep the latest row per month.
pub fn clean_observations(rows: &[ProviderRow], request: &PriceRequest) -> Result<Vec<PriceObservation>, AppError> {
    let mut by_month: BTreeMap<YearMonth, (NaiveDate, f64)> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(adj) = row.adjusted_close.filter(|v| v.is_finite()) else {
            dropped += 1;
            continue;
        };
        if row.date < request.start || row.date >= request.end {
            continue;
        }
        let month = YearMonth::from_date(row.date);
        match by_month.get(&month) {
            Some((seen, _)) if *seen > row.date => {}
            _ => {
                by_month.insert(month, (row.date, adj));
            }
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "rows without an adjusted close dropped");
    }
    if by_month.is_empty() {
        return Err(AppError::DataUnavailable(format!(
            "No prices for {} between {} and {}.",
            request.symbol, request.start, request.end
        )));
    }

    let mut out = Vec::with_capacity(by_month.len());
    for (month, (_, adjusted_close)) in by_month {
        let date = month
            .first_day()
            .ok_or_else(|| AppError::DataUnavailable(format!("Invalid month {month}.")))?;
        if adjusted_close <= 0.0 {
            tracing::warn!(%month, adjusted_close, "non-positive adjusted close");
        }
        out.push(PriceObservation { date, adjusted_close });
    }
    Ok(out)
}

/// Fetch, clean and build the monthly series. Gaps are reported as missing data.
pub fn load_series(
    provider: &dyn PriceProvider,
    request: &PriceRequest,
) -> Result<(Vec<PriceObservation>, TimeSeries), AppError> {
    let rows = provider.fetch(request)?;
    let observations = clean_observations(&rows, request)?;
    let series = TimeSeries::from_observations(&observations)?;
    tracing::info!(
        provider = provider.name(),
        symbol = %request.symbol,
        rows = rows.len(),
        months = series.len(),
        start = %series.start(),
        end = %series.end(),
        "prices loaded"
    );
    Ok((observations, series))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: NaiveDate, adj: Option<f64>) -> ProviderRow {
        ProviderRow {
            date: d,
            adjusted_close: adj,
            ..ProviderRow::default()
        }
    }

    fn request() -> PriceRequest {
        PriceRequest::new("nvda", date(2020, 1, 1), date(2020, 6, 1)).unwrap()
    }

    #[test]
    fn request_validates_inputs() {
        assert_eq!(request().symbol, "NVDA");
        assert!(PriceRequest::new(" ", date(2020, 1, 1), date(2021, 1, 1)).is_err());
        assert!(PriceRequest::new("NVDA", date(2021, 1, 1), date(2021, 1, 1)).is_err());
    }

    #[test]
    fn cleaning_filters_normalises_and_dedupes() {
        let rows = vec![
            row(date(2020, 3, 2), Some(3.0)),
            row(date(2019, 12, 1), Some(0.5)),
            row(date(2020, 1, 1), Some(1.0)),
            row(date(2020, 2, 3), None),
            row(date(2020, 2, 1), Some(2.0)),
            row(date(2020, 3, 20), Some(3.5)),
            row(date(2020, 6, 1), Some(6.0)),
        ];
        let obs = clean_observations(&rows, &request()).unwrap();
        let got: Vec<(NaiveDate, f64)> = obs.iter().map(|o| (o.date, o.adjusted_close)).collect();
        assert_eq!(
            got,
            vec![
                (date(2020, 1, 1), 1.0),
                (date(2020, 2, 1), 2.0),
                (date(2020, 3, 1), 3.5),
            ]
        );
    }

    #[test]
    fn empty_result_is_data_unavailable() {
        let rows = vec![row(date(2020, 1, 1), None), row(date(2021, 1, 1), Some(1.0))];
        assert!(matches!(
            clean_observations(&rows, &request()),
            Err(AppError::DataUnavailable(_))
        ));
    }

    struct Fixed(Vec<ProviderRow>);

    impl PriceProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, _request: &PriceRequest) -> Result<Vec<ProviderRow>, AppError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn gap_in_months_is_data_unavailable() {
        let provider = Fixed(vec![row(date(2020, 1, 1), Some(1.0)), row(date(2020, 3, 1), Some(3.0))]);
        assert!(matches!(
            load_series(&provider, &request()),
            Err(AppError::DataUnavailable(_))
        ));
    }

    #[test]
    fn non_positive_prices_are_kept() {
        let provider = Fixed(vec![row(date(2020, 1, 1), Some(1.0)), row(date(2020, 2, 1), Some(-1.0))]);
        let (_, series) = load_series(&provider, &request()).unwrap();
        assert_eq!(series.values(), &[1.0, -1.0]);
    }
}
