//! Yahoo Finance chart endpoint client.
//!
//! `GET {base}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=1mo`
//! returns parallel arrays of timestamps, OHLCV quotes and adjusted closes.

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::provider::{PriceProvider, PriceRequest, ProviderRow};
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; ticker-forecast/0.1)";

pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Build a client; `TF_CHART_URL` and `TF_USER_AGENT` (or `.env`) override the defaults.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("TF_CHART_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let user_agent = std::env::var("TF_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Provider(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{symbol}", self.base_url)
    }
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

impl PriceProvider for YahooClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch(&self, request: &PriceRequest) -> Result<Vec<ProviderRow>, AppError> {
        let url = self.chart_url(&request.symbol);
        tracing::debug!(%url, start = %request.start, end = %request.end, "chart request");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", unix_seconds(request.start).to_string()),
                ("period2", unix_seconds(request.end).to_string()),
                ("interval", request.interval.as_query().to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .map_err(|e| AppError::Provider(format!("Chart request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::DataUnavailable(format!(
                "Symbol {} not found by provider.",
                request.symbol
            )));
        }
        if !status.is_success() {
            return Err(AppError::Provider(format!("Chart request failed with status {status}.")));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::Provider(format!("Failed to read chart response: {e}")))?;
        parse_chart_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Decode a chart response body into provider rows.
pub fn parse_chart_response(body: &str) -> Result<Vec<ProviderRow>, AppError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::Provider(format!("Failed to parse chart response: {e}")))?;

    if let Some(err) = envelope.chart.error {
        return Err(AppError::DataUnavailable(format!("{}: {}", err.code, err.description)));
    }
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(AppError::DataUnavailable("Chart response has no result.".into()));
    };

    let empty = Quote::default();
    let quote = result.indicators.quote.first().unwrap_or(&empty);
    let adjusted: &[Option<f64>] = result
        .indicators
        .adjclose
        .first()
        .map(|a| a.adjclose.as_slice())
        .unwrap_or(&[]);

    let mut rows = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| AppError::Provider(format!("Invalid timestamp {ts} in chart response.")))?
            .date_naive();
        rows.push(ProviderRow {
            date,
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: at(&quote.volume, i),
            adjusted_close: at(adjusted, i),
        });
    }
    Ok(rows)
}
