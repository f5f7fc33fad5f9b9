//! CSV ingest of historical prices.
//!
//! Turns a price CSV (one row per date) into provider rows:
//! - header names are matched case-insensitively (BOM stripped)
//! - `date` and an adjusted-close column are required
//! - rows that fail to parse are skipped and reported, not fatal

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;

use crate::data::provider::{PriceProvider, PriceRequest, ProviderRow};
use crate::error::AppError;

/// Accepted spellings of the adjusted-close column, in priority order.
const ADJ_CLOSE_COLUMNS: [&str; 5] = ["adj close", "adj_close", "adjusted_close", "adjclose", "adjusted"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedPrices {
    pub rows: Vec<ProviderRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read every usable row of a price CSV.
pub fn load_price_csv(path: &Path) -> Result<IngestedPrices, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::Io(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Io(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    if !header_map.contains_key("date") {
        return Err(AppError::Config("Missing required column: `date`".into()));
    }
    let adj_column = ADJ_CLOSE_COLUMNS
        .iter()
        .copied()
        .find(|c| header_map.contains_key(*c))
        .ok_or_else(|| {
            AppError::Config(format!(
                "Missing adjusted close column (one of: {}).",
                ADJ_CLOSE_COLUMNS.join(", ")
            ))
        })?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map, adj_column) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(
            skipped = row_errors.len(),
            first_line = row_errors[0].line,
            first_error = %row_errors[0].message,
            "CSV rows skipped"
        );
    }

    Ok(IngestedPrices {
        rows,
        row_errors,
        rows_read,
    })
}

/// Offline provider reading a price CSV. The symbol in the request is not checked.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    pub path: PathBuf,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, _request: &PriceRequest) -> Result<Vec<ProviderRow>, AppError> {
        Ok(load_price_csv(&self.path)?.rows)
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>, adj_column: &str) -> Result<ProviderRow, String> {
    let date = parse_date(get_required(record, header_map, "date")?)?;
    let adjusted_close = match get_optional(record, header_map, adj_column) {
        Some(s) if !is_null(s) => Some(
            parse_opt_f64(Some(s)).ok_or_else(|| format!("Invalid adjusted close '{s}'."))?,
        ),
        _ => None,
    };

    Ok(ProviderRow {
        date,
        open: parse_opt_f64(get_optional(record, header_map, "open")),
        high: parse_opt_f64(get_optional(record, header_map, "high")),
        low: parse_opt_f64(get_optional(record, header_map, "low")),
        close: parse_opt_f64(get_optional(record, header_map, "close")),
        volume: parse_opt_f64(get_optional(record, header_map, "volume")),
        adjusted_close,
    })
}

fn is_null(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "na" | "nan" | "null")
}

fn get_required<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, DD/MM/YYYY, MM/DD/YYYY."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_yahoo_style_export() {
        let file = write_csv(
            "\u{feff}Date,Open,High,Low,Close,Adj Close,Volume\n\
             2015-01-01,0.50,0.51,0.46,0.48,0.4722,5100000000\n\
             2015-02-01,0.48,0.55,0.47,0.55,null,4800000000\n\
             not-a-date,1,1,1,1,1,1\n\
             2015-03-01,0.55,0.57,0.52,0.53,abc,4200000000\n",
        );
        let ingested = load_price_csv(file.path()).unwrap();
        assert_eq!(ingested.rows_read, 4);
        assert_eq!(ingested.rows.len(), 2);
        assert_eq!(ingested.rows[0].adjusted_close, Some(0.4722));
        assert_eq!(ingested.rows[0].volume, Some(5.1e9));
        assert_eq!(ingested.rows[1].adjusted_close, None);
        let lines: Vec<usize> = ingested.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn accepts_snake_case_adjusted_close() {
        let file = write_csv("date,adj_close\n2020/01/01,10.5\n");
        let ingested = load_price_csv(file.path()).unwrap();
        assert_eq!(ingested.rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(ingested.rows[0].adjusted_close, Some(10.5));
    }

    #[test]
    fn missing_columns_are_config_errors() {
        let file = write_csv("date,close\n2020-01-01,10\n");
        assert!(matches!(load_price_csv(file.path()), Err(AppError::Config(_))));
        let file = write_csv("day,adj close\n2020-01-01,10\n");
        assert!(matches!(load_price_csv(file.path()), Err(AppError::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_price_csv(Path::new("/nonexistent/prices.csv")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
