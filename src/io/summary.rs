//! JSON run summary.
//!
//! A self-contained record of one run: the comparison table, skipped models,
//! the selected ARIMA order and the hold-out forecasts.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{EvaluationRow, ModelKind, TimeSeries, YearMonth};
use crate::fit::HoldoutOutcome;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedModel {
    pub model: ModelKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub model: ModelKind,
    pub label: String,
    pub rmse: Option<f64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutSummary {
    pub train_len: usize,
    pub test_len: usize,
    pub test_start: YearMonth,
    pub forecasts: Vec<ForecastSummary>,
    pub skipped: Vec<SkippedModel>,
    pub preferred: Option<ModelKind>,
}

impl From<&HoldoutOutcome> for HoldoutSummary {
    fn from(outcome: &HoldoutOutcome) -> Self {
        Self {
            train_len: outcome.train_len,
            test_len: outcome.test_len,
            test_start: outcome.test_start,
            forecasts: outcome
                .results
                .iter()
                .map(|r| ForecastSummary {
                    model: r.model,
                    label: r.label.clone(),
                    rmse: r.rmse,
                    values: r.forecast.clone(),
                })
                .collect(),
            skipped: skipped_list(&outcome.skipped),
            preferred: outcome.preferred,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub symbol: String,
    pub start: YearMonth,
    pub end: YearMonth,
    pub n_obs: usize,
    pub table: Vec<EvaluationRow>,
    pub skipped: Vec<SkippedModel>,
    pub arima_order: Option<String>,
    pub holdout: Option<HoldoutSummary>,
}

impl RunSummary {
    pub fn new(symbol: &str, series: &TimeSeries, table: Vec<EvaluationRow>, skipped: &[(ModelKind, String)]) -> Self {
        Self {
            symbol: symbol.to_string(),
            start: series.start(),
            end: series.end(),
            n_obs: series.len(),
            table,
            skipped: skipped_list(skipped),
            arima_order: None,
            holdout: None,
        }
    }
}

fn skipped_list(skipped: &[(ModelKind, String)]) -> Vec<SkippedModel> {
    skipped
        .iter()
        .map(|(model, reason)| SkippedModel {
            model: *model,
            reason: reason.clone(),
        })
        .collect()
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::Io(format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

pub fn read_summary_json(path: &Path) -> Result<RunSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::Io(format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::Io(format!("Invalid summary JSON: {e}")))
}
