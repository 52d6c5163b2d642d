//! Error types.
//!
//! `AppError` is what every command returns: a message plus the process exit
//! code the binary should use. Loading a table produces the more specific
//! `LoadError`, which keeps the format/validation split visible to callers
//! (the TUI shows them differently) before being folded into an `AppError`.

use thiserror::Error;

/// Exit code for bad input: unreadable files, missing columns, bad values, bad flags.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when loading succeeded but nothing usable remains.
pub const EXIT_EMPTY: u8 = 3;
/// Exit code for runtime failures (terminal, filesystem writes).
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// The uploaded file could not be read as a table at all.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Could not read '{origin}' as a table: {message}")]
pub struct FormatError {
    /// File name (or label) of the source that failed.
    pub origin: String,
    pub message: String,
}

impl FormatError {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

/// The table was readable but does not satisfy the expected schema.
///
/// `line` is the 1-based line in the source file (header = line 1).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required column(s): {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Line {line}: column `{column}` is empty")]
    MissingValue { line: usize, column: String },

    #[error("Line {line}: column `{column}` has non-numeric value '{value}'")]
    NonNumeric {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Line {line}: column `{column}` is not a finite number ('{value}')")]
    NonFinite {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Line {line}: duplicate identifier '{id}'")]
    DuplicateId { line: usize, id: String },

    #[error("Table contains no usable rows")]
    NoRows,
}

/// Failure to load a parameter or observation table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        let code = match &err {
            LoadError::Validation(ValidationError::NoRows) => EXIT_EMPTY,
            _ => EXIT_INPUT,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_message_names_every_column() {
        let err = ValidationError::MissingColumns {
            columns: vec!["b1".to_string(), "b2".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required column(s): b1, b2");
    }

    #[test]
    fn load_error_maps_to_input_exit_code() {
        let err: AppError = LoadError::from(FormatError::new("x.csv", "bad")).into();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.to_string().contains("x.csv"));

        let empty: AppError = LoadError::from(ValidationError::NoRows).into();
        assert_eq!(empty.exit_code(), EXIT_EMPTY);
    }
}
