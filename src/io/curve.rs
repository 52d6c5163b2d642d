//! Read/write curve JSON files.
//!
//! Curve JSON is the portable representation of evaluated curves:
//! - the parameter row of each identifier
//! - where the parameters came from
//! - a precomputed `(time, predicted)` grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`. JSON has no `NaN`/`inf`, so
//! non-finite predictions are written as `null`.

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{CurveEntry, CurveFile, CurveGrid, GrowthCurve, ParameterOrigin};
use crate::error::{AppError, EXIT_INPUT, EXIT_RUNTIME};

const TOOL_NAME: &str = "growth";

/// Build the JSON document for a set of evaluated curves.
pub fn curve_file(curves: &[GrowthCurve], origin: &ParameterOrigin) -> CurveFile {
    CurveFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Local::now(),
        origin: origin.to_string(),
        curves: curves.iter().map(curve_entry).collect(),
    }
}

fn curve_entry(curve: &GrowthCurve) -> CurveEntry {
    let (time, predicted): (Vec<f64>, Vec<Option<f64>>) = curve
        .points
        .iter()
        .map(|&(t, y)| (t, y.is_finite().then_some(y)))
        .unzip();
    CurveEntry {
        params: curve.params.clone(),
        grid: CurveGrid { time, predicted },
    }
}

/// Rebuild a `GrowthCurve` from a saved entry; `null` predictions come back as `NaN`.
pub fn curve_from_entry(entry: &CurveEntry) -> GrowthCurve {
    GrowthCurve {
        params: entry.params.clone(),
        points: entry
            .grid
            .time
            .iter()
            .zip(entry.grid.predicted.iter())
            .map(|(&t, y)| (t, y.unwrap_or(f64::NAN)))
            .collect(),
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curves: &[GrowthCurve], origin: &ParameterOrigin) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_RUNTIME,
            format!("Failed to create curve JSON '{}': {e}", path.display()),
        )
    })?;

    serde_json::to_writer_pretty(file, &curve_file(curves, origin))
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write curve JSON: {e}")))?;

    log::info!("wrote {} curve(s) to {}", curves.len(), path.display());
    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open curve JSON '{}': {e}", path.display()),
        )
    })?;
    let curve: CurveFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid curve JSON: {e}")))?;

    for entry in &curve.curves {
        if entry.grid.time.len() != entry.grid.predicted.len() {
            return Err(AppError::new(
                EXIT_INPUT,
                format!(
                    "Invalid curve JSON: grid for '{}' has {} time(s) but {} prediction(s).",
                    entry.params.id,
                    entry.grid.time.len(),
                    entry.grid.predicted.len()
                ),
            ));
        }
    }
    Ok(curve)
}
