use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to save checkpoint: {0}")]
    SaveCheckpoint(String),

    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),

    #[error("Failed to append WAL entry: {0}")]
    AppendWal(String),

    #[error("Failed to iterate WAL entries: {0}")]
    IterateWal(String),

    #[error("Failed to clear state for job {job_id}: {message}")]
    Clear { job_id: String, message: String },

    #[error(
        "Refusing to overwrite checkpoint for job {job_id}: stored {stored_rows} rows{stored_state}, new {new_rows} rows"
    )]
    StaleCheckpoint {
        job_id: String,
        stored_rows: u64,
        stored_state: &'static str,
        new_rows: u64,
    },

    #[error("Checkpoint serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to fetch rows: {0}")]
    Fetch(String),

    #[error("Failed to decode row {row}: {message}")]
    Decode { row: u64, message: String },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write line: {0}")]
    Write(String),

    #[error("Failed to flush output: {0}")]
    Flush(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to read WAL: {0}")]
    Wal(String),

    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),
}
