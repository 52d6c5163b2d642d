//! Raw tabular input (CSV or spreadsheet).
//!
//! Both loaders (parameters and observations) start from the same shape: a
//! header row plus data rows of loosely typed cells. This module only turns
//! bytes into that shape; no schema knowledge lives here.
//!
//! Format is chosen by file extension: spreadsheet extensions go through
//! `calamine` (first worksheet), anything else is parsed as CSV.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::FormatError;

/// Extensions read as spreadsheets.
const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xls", "xlsm", "xlsb", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Spreadsheet,
}

impl TableFormat {
    /// Pick the format from a file name (case-insensitive extension).
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            TableFormat::Spreadsheet
        } else {
            TableFormat::Csv
        }
    }
}

/// A single cell as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Text form used for identifiers and error messages.
    ///
    /// Integral spreadsheet numbers render without a fractional part, so an
    /// identifier typed as `101` in Excel reads back as `"101"`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(v) => format!("{v}"),
            Cell::Text(s) => s.trim().to_string(),
        }
    }

    /// Numeric value; `Err` carries the offending text.
    pub fn as_f64(&self) -> Result<f64, String> {
        match self {
            Cell::Number(v) => Ok(*v),
            Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| s.trim().to_string()),
            Cell::Empty => Err(String::new()),
        }
    }
}

/// A data row with its 1-based source line (header is line 1).
#[derive(Debug, Clone)]
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn get(&self, idx: usize) -> &Cell {
        self.cells.get(idx).unwrap_or(&Cell::Empty)
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// Header + rows, with header names normalized for schema matching.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Display name of the source (file name).
    pub origin: String,
    /// Normalized header names in column order.
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl RawTable {
    /// Map of normalized header name -> column index (first occurrence wins).
    pub fn header_map(&self) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for (idx, name) in self.headers.iter().enumerate() {
            map.entry(name.clone()).or_insert(idx);
        }
        map
    }
}

/// Read a table from a file on disk.
pub fn read_table_path(path: &Path) -> Result<RawTable, FormatError> {
    let origin = display_name(path);
    let bytes = std::fs::read(path)
        .map_err(|e| FormatError::new(origin.clone(), format!("failed to open file: {e}")))?;
    read_table_bytes(&origin, bytes)
}

/// Read a table from in-memory bytes (e.g. an uploaded file) named `name`.
pub fn read_table_bytes(name: &str, bytes: Vec<u8>) -> Result<RawTable, FormatError> {
    let table = match TableFormat::from_name(name) {
        TableFormat::Csv => read_csv(name, &bytes)?,
        TableFormat::Spreadsheet => read_spreadsheet(name, bytes)?,
    };
    log::debug!(
        "read table '{}': {} column(s), {} row(s)",
        table.origin,
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Normalize a header cell for schema matching.
pub fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header (e.g. "\u{feff}ID"). If we don't strip it, schema validation
    // will incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase()
}

fn read_csv(name: &str, bytes: &[u8]) -> Result<RawTable, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FormatError::new(name, format!("failed to read header row: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();
    ensure_header(name, &headers)?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| FormatError::new(name, format!("malformed record: {e}")))?;
        // The reader skips empty lines, so prefer its own position over the
        // record count (+2: header is line 1, lines are 1-based).
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let cells = record
            .iter()
            .map(|s| {
                if s.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(s.to_string())
                }
            })
            .collect();
        push_row(&mut rows, TableRow { line, cells });
    }

    Ok(RawTable {
        origin: name.to_string(),
        headers,
        rows,
    })
}

fn read_spreadsheet(name: &str, bytes: Vec<u8>) -> Result<RawTable, FormatError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| FormatError::new(name, format!("unreadable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FormatError::new(name, "workbook has no worksheets"))?
        .map_err(|e| FormatError::new(name, format!("unreadable worksheet: {e}")))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header
            .iter()
            .map(|c| normalize_header_name(&spreadsheet_cell(c).as_text()))
            .collect(),
        None => Vec::new(),
    };
    ensure_header(name, &headers)?;

    // The range begins at the first used cell, not at worksheet row 1.
    let header_line = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = Vec::new();
    for (idx, row) in sheet_rows.enumerate() {
        let line = header_line + idx + 1;
        let cells = row.iter().map(spreadsheet_cell).collect();
        push_row(&mut rows, TableRow { line, cells });
    }

    Ok(RawTable {
        origin: name.to_string(),
        headers,
        rows,
    })
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

fn ensure_header(name: &str, headers: &[String]) -> Result<(), FormatError> {
    if headers.iter().all(|h| h.is_empty()) {
        return Err(FormatError::new(name, "no header row found"));
    }
    Ok(())
}

fn push_row(rows: &mut Vec<TableRow>, row: TableRow) {
    if !row.is_blank() {
        rows.push(row);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
