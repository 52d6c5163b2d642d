//! Observation ingest and normalization.
//!
//! This module turns a measured-growth table into clean `ObservationRecord`s
//! that can be compared against the reference curves.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (input order is preserved)
//! - **Separation of concerns**: no curve logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::domain::ObservationRecord;
use crate::error::{AppError, EXIT_RUNTIME, LoadError, ValidationError};
use crate::io::table::{RawTable, TableRow, read_table_bytes, read_table_path};

/// Accepted names for the time column, in priority order.
pub const TIME_COLUMNS: [&str; 5] = ["t", "time", "day", "days", "age"];
/// Accepted names for the measurement column, in priority order.
pub const VALUE_COLUMNS: [&str; 4] = ["observed", "weight", "value", "y"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: normalized records + row errors.
#[derive(Debug, Clone, Default)]
pub struct IngestedObservations {
    pub origin: String,
    pub records: Vec<ObservationRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load observations from a file on disk.
pub fn load_observations(path: &Path) -> Result<IngestedObservations, LoadError> {
    let table = read_table_path(path)?;
    Ok(observations_from_table(&table)?)
}

/// Load observations from in-memory bytes (e.g. an upload) named `name`.
pub fn load_observations_bytes(name: &str, bytes: Vec<u8>) -> Result<IngestedObservations, LoadError> {
    let table = read_table_bytes(name, bytes)?;
    Ok(observations_from_table(&table)?)
}

/// Validate a raw table against the observation schema.
pub fn observations_from_table(table: &RawTable) -> Result<IngestedObservations, ValidationError> {
    let header_map = table.header_map();

    let id_idx = header_map.get("id").copied();
    let time_idx = first_present(&header_map, &TIME_COLUMNS);
    let value_idx = first_present(&header_map, &VALUE_COLUMNS);

    let (Some(id_idx), Some(time_idx), Some(value_idx)) = (id_idx, time_idx, value_idx) else {
        let mut columns = Vec::new();
        if id_idx.is_none() {
            columns.push("id".to_string());
        }
        if time_idx.is_none() {
            columns.push(format!("one of {}", TIME_COLUMNS.join("/")));
        }
        if value_idx.is_none() {
            columns.push(format!("one of {}", VALUE_COLUMNS.join("/")));
        }
        return Err(ValidationError::MissingColumns { columns });
    };

    let mut records = Vec::new();
    let mut row_errors = Vec::new();

    for row in &table.rows {
        match parse_row(row, id_idx, time_idx, value_idx) {
            Ok(record) => records.push(record),
            Err(err) => {
                log::warn!("{}: skipping line {}: {}", table.origin, err.line, err.message);
                row_errors.push(err);
            }
        }
    }

    if records.is_empty() {
        return Err(ValidationError::NoRows);
    }

    log::info!(
        "loaded {} observation(s) from {} ({} skipped)",
        records.len(),
        table.origin,
        row_errors.len()
    );

    Ok(IngestedObservations {
        origin: table.origin.clone(),
        records,
        row_errors,
        rows_read: table.rows.len(),
    })
}

/// Write observations as `id,t,observed` CSV.
pub fn write_observations_csv(path: &Path, records: &[ObservationRecord]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_RUNTIME,
            format!("Failed to create observation CSV '{}': {e}", path.display()),
        )
    })?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(["id", "t", "observed"])
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write observation CSV header: {e}")))?;
    for r in records {
        writer
            .write_record([r.id.clone(), format!("{:.4}", r.time), format!("{:.4}", r.observed)])
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write observation CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to flush observation CSV: {e}")))?;
    Ok(())
}

fn first_present(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| header_map.get(*name).copied())
}

fn parse_row(row: &TableRow, id_idx: usize, time_idx: usize, value_idx: usize) -> Result<ObservationRecord, RowError> {
    let id = row.get(id_idx).as_text();
    if id.is_empty() {
        return Err(RowError {
            line: row.line,
            id: None,
            message: "Missing identifier.".to_string(),
        });
    }

    let time = parse_finite(row, time_idx, "time").map_err(|message| RowError {
        line: row.line,
        id: Some(id.clone()),
        message,
    })?;
    let observed = parse_finite(row, value_idx, "observed value").map_err(|message| RowError {
        line: row.line,
        id: Some(id.clone()),
        message,
    })?;

    Ok(ObservationRecord {
        id,
        time,
        observed,
        line: Some(row.line),
    })
}

fn parse_finite(row: &TableRow, idx: usize, what: &str) -> Result<f64, String> {
    let cell = row.get(idx);
    if cell.is_empty() {
        return Err(format!("Missing {what}."));
    }
    let v = cell
        .as_f64()
        .map_err(|raw| format!("Invalid {what} '{raw}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite {what}."))
    }
}
