//! Input/output helpers.
//!
//! - raw CSV/spreadsheet reading (`table`)
//! - parameter table loading + validation (`params`)
//! - observation ingest + validation (`ingest`)
//! - comparison exports (CSV) (`export`)
//! - curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;
pub mod params;
pub mod table;

pub use curve::*;
pub use export::*;
pub use ingest::*;
pub use params::*;
pub use table::{RawTable, TableFormat, read_table_bytes, read_table_path};
