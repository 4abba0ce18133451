use engine_core::error::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Column '{0}' is missing from the CSV header")]
    MissingColumn(String),
    #[error("Row {row}, column '{column}': {message}")]
    InvalidValue {
        row: u64,
        column: String,
        message: String,
    },
}

impl From<FileError> for SourceError {
    fn from(err: FileError) -> Self {
        match &err {
            FileError::InvalidValue { row, .. } => {
                SourceError::Decode {
                    row: *row,
                    message: err.to_string(),
                }
            }
            _ => SourceError::Fetch(err.to_string()),
        }
    }
}
