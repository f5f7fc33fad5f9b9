//! CSV exports: the comparison table and synthetic price samples.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{EvaluationRow, PriceObservation};
use crate::error::AppError;

fn opt_cell(v: Option<f64>) -> String {
    v.filter(|x| x.is_finite()).map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Write the comparison table; undefined metrics are empty cells.
pub fn write_table_csv(path: &Path, rows: &[EvaluationRow]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "model,rmse,aic,bic")
        .map_err(|e| AppError::Io(format!("Failed to write export CSV header: {e}")))?;

    for row in rows {
        writeln!(
            file,
            "{},{},{},{}",
            row.model.display_name(),
            opt_cell(row.rmse),
            opt_cell(row.aic),
            opt_cell(row.bic),
        )
        .map_err(|e| AppError::Io(format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}

/// Write prices in the layout `io::ingest` reads back.
pub fn write_sample_csv(path: &Path, observations: &[PriceObservation]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::Io(format!("Failed to create sample CSV '{}': {e}", path.display())))?;

    writeln!(file, "date,close,adj_close")
        .map_err(|e| AppError::Io(format!("Failed to write sample CSV header: {e}")))?;
    for o in observations {
        writeln!(file, "{},{:.6},{:.6}", o.date, o.adjusted_close, o.adjusted_close)
            .map_err(|e| AppError::Io(format!("Failed to write sample CSV row: {e}")))?;
    }
    Ok(())
}
