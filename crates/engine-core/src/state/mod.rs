use crate::{
    error::StateStoreError,
    state::models::{CheckpointRecord, WalEntry},
};

pub mod memory;
pub mod models;
pub mod sled_store;

/// Durable home of a job's checkpoint and run journal.
pub trait StateStore: Send + Sync {
    fn load_checkpoint(&self, job_id: &str) -> Result<Option<CheckpointRecord>, StateStoreError>;
    fn save_checkpoint(&self, cp: &CheckpointRecord) -> Result<(), StateStoreError>;
    fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError>;
    fn iter_wal(&self, job_id: &str) -> Result<Vec<WalEntry>, StateStoreError>;
    /// Forgets the checkpoint and journal of a job.
    fn clear(&self, job_id: &str) -> Result<(), StateStoreError>;
}

/// Rejects a checkpoint that would move a job backwards: fewer rows than
/// the stored one, or an in-progress position over a finished job.
pub(crate) fn ensure_not_stale(
    existing: &CheckpointRecord,
    new: &CheckpointRecord,
) -> Result<(), StateStoreError> {
    let reopens = existing.is_exhausted() && !new.is_exhausted();
    if new.rows_done < existing.rows_done || reopens {
        return Err(StateStoreError::StaleCheckpoint {
            job_id: new.job_id.clone(),
            stored_rows: existing.rows_done,
            stored_state: if existing.is_exhausted() {
                " (complete)"
            } else {
                ""
            },
            new_rows: new.rows_done,
        });
    }
    Ok(())
}
