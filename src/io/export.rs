//! Export per-observation comparison results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.
//! Non-finite predictions are written verbatim (`NaN`, `inf`) and flagged.

use std::fs::File;
use std::path::Path;

use crate::error::{AppError, EXIT_RUNTIME};
use crate::report::ComparisonRow;

/// Flag written next to rows whose prediction is not finite.
pub const NON_FINITE_FLAG: &str = "non-finite";

/// Write comparison rows to a CSV file.
pub fn write_results_csv(path: &Path, rows: &[ComparisonRow]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_RUNTIME,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(["id", "t", "observed", "predicted", "residual", "flag"])
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        let flag = if r.is_finite() { "" } else { NON_FINITE_FLAG };
        writer
            .write_record([
                r.id.clone(),
                format!("{:.4}", r.time),
                format!("{:.4}", r.observed),
                format!("{:.4}", r.predicted),
                format!("{:.4}", r.residual),
                flag.to_string(),
            ])
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to flush export CSV: {e}")))?;

    log::info!("wrote {} comparison row(s) to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, predicted: f64) -> ComparisonRow {
        ComparisonRow {
            id: id.to_string(),
            time: 10.0,
            observed: 100.0,
            predicted,
            residual: 100.0 - predicted,
            line: Some(2),
        }
    }

    #[test]
    fn writes_header_rows_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_results_csv(&path, &[row("North", 90.5), row("Bad", f64::INFINITY)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,t,observed,predicted,residual,flag");
        assert_eq!(lines[1], "North,10.0000,100.0000,90.5000,9.5000,");
        assert_eq!(lines[2], "Bad,10.0000,100.0000,inf,-inf,non-finite");
    }
}
