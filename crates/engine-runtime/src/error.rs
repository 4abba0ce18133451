use connectors::file::csv::error::FileError;
use engine_config::settings::error::SettingsError;
use engine_core::error::{ProgressError, SinkError, StateStoreError};
use engine_processing::error::ReportError;
use thiserror::Error;

/// Top-level errors for driving a report job.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Initialization error.
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// Setting error.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    /// The input file could not be opened or its header is unusable.
    #[error("Input error: {0}")]
    Input(#[from] FileError),

    #[error("Output error: {0}")]
    Output(#[from] SinkError),

    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    /// The report run itself failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// An error occurred while joining a task.
    /// This usually indicates that the task was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
