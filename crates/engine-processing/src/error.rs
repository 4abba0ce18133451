use engine_config::settings::error::SettingsError;
use engine_core::error::{SinkError, SourceError, StateStoreError};
use model::records::key::KeyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Value {value} does not fit field '{field}' of width {width}")]
    NumericOverflow {
        field: String,
        value: String,
        width: usize,
    },

    #[error("Field '{field}' cannot render {value}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Row {row} is out of order: key [{current}] follows [{previous}]")]
    OutOfOrder {
        row: u64,
        previous: String,
        current: String,
    },

    #[error("Failed to persist checkpoint: {0}")]
    CheckpointPersist(#[source] StateStoreError),

    #[error("Failed to load checkpoint: {0}")]
    CheckpointLoad(#[source] StateStoreError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl From<KeyError> for ReportError {
    fn from(err: KeyError) -> Self {
        ReportError::Configuration(err.to_string())
    }
}

impl From<SettingsError> for ReportError {
    fn from(err: SettingsError) -> Self {
        ReportError::Configuration(err.to_string())
    }
}
