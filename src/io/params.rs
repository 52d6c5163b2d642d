//! Parameter table loading and validation.
//!
//! Turns a tabular source (bundled default, file on disk, or uploaded bytes)
//! into a typed `ParameterSet`. The schema check is explicit:
//!
//! - **Strict columns**: `id, b0, b1, b2` (case-insensitive, any order)
//! - **Strict values**: every coefficient must be a finite number; the first
//!   bad cell aborts the load and is reported with its line and column
//! - **No partial results**: callers get either a complete set or an error

use std::path::PathBuf;

use crate::domain::{CurveParameters, ParameterOrigin, ParameterSet};
use crate::error::{LoadError, ValidationError};
use crate::io::table::{RawTable, TableRow, read_table_bytes, read_table_path};

/// The parameter table shipped with the binary.
pub const DEFAULT_PARAMETERS_CSV: &str = include_str!("../../assets/default_parameters.csv");
const DEFAULT_PARAMETERS_NAME: &str = "default_parameters.csv";

const REQUIRED_COLUMNS: [&str; 4] = ["id", "b0", "b1", "b2"];

/// Where to load parameters from.
#[derive(Debug, Clone)]
pub enum ParameterSource {
    /// The bundled default table.
    Bundled,
    /// A table on disk (`.csv`, `.xlsx`, `.xls`, ...).
    Path(PathBuf),
    /// An uploaded file held in memory; `name` decides the format.
    Upload { name: String, bytes: Vec<u8> },
}

impl ParameterSource {
    /// `None` means "no upload": use the bundled defaults.
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => ParameterSource::Path(path),
            None => ParameterSource::Bundled,
        }
    }

    pub fn origin(&self) -> ParameterOrigin {
        match self {
            ParameterSource::Bundled => ParameterOrigin::Bundled,
            ParameterSource::Path(path) => ParameterOrigin::File(
                path.file_name()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| path.display().to_string()),
            ),
            ParameterSource::Upload { name, .. } => ParameterOrigin::File(name.clone()),
        }
    }
}

/// Load and validate a parameter table.
pub fn load_parameters(source: &ParameterSource) -> Result<ParameterSet, LoadError> {
    let table = match source {
        ParameterSource::Bundled => {
            read_table_bytes(DEFAULT_PARAMETERS_NAME, DEFAULT_PARAMETERS_CSV.as_bytes().to_vec())?
        }
        ParameterSource::Path(path) => read_table_path(path)?,
        ParameterSource::Upload { name, bytes } => read_table_bytes(name, bytes.clone())?,
    };

    let set = parameters_from_table(&table)?;
    log::info!("loaded {} parameter row(s) from {}", set.len(), source.origin());
    Ok(set)
}

/// Validate a raw table against the parameter schema.
pub fn parameters_from_table(table: &RawTable) -> Result<ParameterSet, ValidationError> {
    let header_map = table.header_map();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header_map.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns { columns: missing });
    }

    let id_idx = header_map["id"];
    let b0_idx = header_map["b0"];
    let b1_idx = header_map["b1"];
    let b2_idx = header_map["b2"];

    let mut set = ParameterSet::new();
    for row in &table.rows {
        let id = row.get(id_idx).as_text();
        if id.is_empty() {
            log::warn!("{}: line {} has no identifier, skipping", table.origin, row.line);
            continue;
        }

        let params = CurveParameters {
            id,
            b0: coefficient(row, b0_idx, "b0")?,
            b1: coefficient(row, b1_idx, "b1")?,
            b2: coefficient(row, b2_idx, "b2")?,
        };

        set.insert(params).map_err(|dup| ValidationError::DuplicateId {
            line: row.line,
            id: dup.id,
        })?;
    }

    if set.is_empty() {
        return Err(ValidationError::NoRows);
    }
    Ok(set)
}

fn coefficient(row: &TableRow, idx: usize, column: &str) -> Result<f64, ValidationError> {
    let cell = row.get(idx);
    if cell.is_empty() {
        return Err(ValidationError::MissingValue {
            line: row.line,
            column: column.to_string(),
        });
    }

    let value = cell.as_f64().map_err(|value| ValidationError::NonNumeric {
        line: row.line,
        column: column.to_string(),
        value,
    })?;

    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            line: row.line,
            column: column.to_string(),
            value: cell.as_text(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    fn upload(name: &str, data: &str) -> ParameterSource {
        ParameterSource::Upload {
            name: name.to_string(),
            bytes: data.as_bytes().to_vec(),
        }
    }

    #[test]
    fn bundled_defaults_round_trip_exactly() {
        let set = load_parameters(&ParameterSource::Bundled).unwrap();

        let ids: Vec<&str> = set.ids().collect();
        assert_eq!(ids, vec!["North", "South", "East", "West", "Central"]);

        let north = set.get("North").unwrap();
        assert_eq!(north.b0, 612.4);
        assert_eq!(north.b1, 2.92);
        assert_eq!(north.b2, 0.0061);

        let central = set.get("Central").unwrap();
        assert_eq!((central.b0, central.b1, central.b2), (571.3, 2.84, 0.0066));
    }

    #[test]
    fn headers_are_case_and_order_insensitive() {
        let set = load_parameters(&upload("p.csv", "B2,id,B1,b0,notes\n0.05,RegionA,3.5,500,x\n")).unwrap();
        let a = set.get("RegionA").unwrap();
        assert_eq!((a.b0, a.b1, a.b2), (500.0, 3.5, 0.05));
    }

    #[test]
    fn missing_b2_column_is_reported() {
        let err = load_parameters(&upload("p.csv", "ID,b0,b1\nRegionA,500,3.5\n")).unwrap_err();
        assert_eq!(
            err,
            LoadError::Validation(ValidationError::MissingColumns {
                columns: vec!["b2".to_string()]
            })
        );
        assert!(err.to_string().contains("b2"));
    }

    fn workbook(name: &str, bytes: &[u8]) -> ParameterSource {
        ParameterSource::Upload {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn workbook_upload_keeps_exact_coefficients() {
        let source = workbook("parameters.xlsx", include_bytes!("../../tests/fixtures/parameters.xlsx"));
        let set = load_parameters(&source).unwrap();

        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["North", "South", "East"]);
        let north = set.get("North").unwrap();
        assert_eq!((north.b0, north.b1, north.b2), (612.4, 2.92, 0.0061));
        let east = set.get("East").unwrap();
        assert_eq!((east.b0, east.b1, east.b2), (500.0, 3.0, 0.005));
        assert_eq!(source.origin(), ParameterOrigin::File("parameters.xlsx".to_string()));
    }

    #[test]
    fn workbook_bad_cell_reports_its_worksheet_row() {
        let source = workbook(
            "parameters_offset.xlsx",
            include_bytes!("../../tests/fixtures/parameters_offset.xlsx"),
        );
        let err = load_parameters(&source).unwrap_err();
        assert_eq!(
            err,
            LoadError::Validation(ValidationError::NonNumeric {
                line: 5,
                column: "b1".to_string(),
                value: "abc".to_string(),
            })
        );
    }

    #[test]
    fn non_numeric_coefficient_names_line_and_column() {
        let err = load_parameters(&upload("p.csv", "ID,b0,b1,b2\nA,500,3.5,0.05\nB,450,abc,0.04\n")).unwrap_err();
        assert_eq!(
            err,
            LoadError::Validation(ValidationError::NonNumeric {
                line: 3,
                column: "b1".to_string(),
                value: "abc".to_string(),
            })
        );
    }

    #[test]
    fn empty_and_non_finite_coefficients_are_rejected() {
        let err = load_parameters(&upload("p.csv", "ID,b0,b1,b2\nA,,3.5,0.05\n")).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Validation(ValidationError::MissingValue { line: 2, ref column }) if column == "b0"
        ));

        let err = load_parameters(&upload("p.csv", "ID,b0,b1,b2\nA,inf,3.5,0.05\n")).unwrap_err();
        assert!(matches!(err, LoadError::Validation(ValidationError::NonFinite { .. })));
    }

    #[test]
    fn blank_identifiers_are_skipped_and_duplicates_rejected() {
        let set = load_parameters(&upload("p.csv", "ID,b0,b1,b2\n,1,2,3\nA,500,3.5,0.05\n")).unwrap();
        assert_eq!(set.len(), 1);

        let err = load_parameters(&upload("p.csv", "ID,b0,b1,b2\nA,1,2,3\nA,4,5,6\n")).unwrap_err();
        assert_eq!(
            err,
            LoadError::Validation(ValidationError::DuplicateId {
                line: 3,
                id: "A".to_string()
            })
        );
    }

    #[test]
    fn header_only_table_has_no_rows() {
        let err = load_parameters(&upload("p.csv", "ID,b0,b1,b2\n")).unwrap_err();
        assert_eq!(err, LoadError::Validation(ValidationError::NoRows));
    }

    #[test]
    fn unreadable_file_is_a_format_error() {
        let err = load_parameters(&upload("params.xlsx", "ID,b0,b1,b2\n")).unwrap_err();
        assert!(matches!(err, LoadError::Format(FormatError { ref origin, .. }) if origin == "params.xlsx"));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herd.csv");
        std::fs::write(&path, "id,b0,b1,b2\nHerd1,480,3.1,0.007\n").unwrap();

        let source = ParameterSource::from_option(Some(path));
        assert_eq!(source.origin(), ParameterOrigin::File("herd.csv".to_string()));
        let set = load_parameters(&source).unwrap();
        assert_eq!(set.get("Herd1").unwrap().b2, 0.007);

        let missing = ParameterSource::Path(dir.path().join("nope.csv"));
        assert!(matches!(load_parameters(&missing), Err(LoadError::Format(_))));
    }
}
