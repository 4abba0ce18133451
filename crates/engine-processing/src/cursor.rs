use crate::error::ReportError;
use engine_core::state::{
    StateStore,
    models::{CheckpointRecord, EngineSnapshot},
};
use model::{pagination::cursor::ResumePoint, records::key::BreakKey};
use std::sync::Arc;
use tracing::{debug, info};

/// Persists and restores a job's position in its row stream.
///
/// The row counter is advanced once per processed row; once it reaches
/// the frequency the caller persists the current composite key and the
/// counter starts over. A finished stream is recorded as
/// [`ResumePoint::Exhausted`] so a re-run fetches nothing.
pub struct CheckpointCursor {
    job_id: String,
    store: Arc<dyn StateStore>,
    frequency: u64,
    rows_since_checkpoint: u64,
    rows_done: u64,
    position: ResumePoint,
    restored: Option<EngineSnapshot>,
}

impl CheckpointCursor {
    pub fn open(
        store: Arc<dyn StateStore>,
        job_id: &str,
        frequency: u64,
    ) -> Result<Self, ReportError> {
        if frequency == 0 {
            return Err(ReportError::Configuration(
                "checkpoint frequency must be greater than zero".into(),
            ));
        }

        let checkpoint = store
            .load_checkpoint(job_id)
            .map_err(ReportError::CheckpointLoad)?;

        let (position, rows_done, restored) = match checkpoint {
            Some(cp) => {
                info!(
                    job_id,
                    position = ?cp.position,
                    rows_done = cp.rows_done,
                    "Resuming from checkpoint"
                );
                (cp.position, cp.rows_done, Some(cp.state))
            }
            None => {
                info!(job_id, "No checkpoint found, starting from beginning");
                (ResumePoint::Beginning, 0, None)
            }
        };

        Ok(Self {
            job_id: job_id.to_string(),
            store,
            frequency,
            rows_since_checkpoint: 0,
            rows_done,
            position,
            restored,
        })
    }

    /// The last persisted position, or the beginning sentinel.
    pub fn resume_point(&self) -> &ResumePoint {
        &self.position
    }

    /// Exclusive lower bound for the row source.
    pub fn resume_key(&self) -> Option<&BreakKey> {
        self.position.after_key()
    }

    /// Engine state saved with the checkpoint. Yields it once.
    pub fn take_restored_state(&mut self) -> Option<EngineSnapshot> {
        self.restored.take()
    }

    /// Rows consumed by all runs of the job, including this one.
    pub fn rows_done(&self) -> u64 {
        self.rows_done
    }

    pub fn rows_since_checkpoint(&self) -> u64 {
        self.rows_since_checkpoint
    }

    pub fn advance(&mut self) {
        self.rows_since_checkpoint += 1;
        self.rows_done += 1;
    }

    pub fn due_for_persist(&self) -> bool {
        self.rows_since_checkpoint >= self.frequency
    }

    pub fn persist(&mut self, key: &BreakKey, state: EngineSnapshot) -> Result<(), ReportError> {
        self.save(ResumePoint::After(key.clone()), state)?;
        debug!(job_id = %self.job_id, rows_done = self.rows_done, key = %key, "Checkpoint persisted");
        Ok(())
    }

    /// Records that the stream was fully consumed.
    pub fn mark_complete(
        &mut self,
        last: Option<BreakKey>,
        state: EngineSnapshot,
    ) -> Result<(), ReportError> {
        self.save(ResumePoint::Exhausted { last }, state)?;
        info!(job_id = %self.job_id, rows_done = self.rows_done, "Stream marked complete");
        Ok(())
    }

    fn save(&mut self, position: ResumePoint, state: EngineSnapshot) -> Result<(), ReportError> {
        let record = CheckpointRecord {
            job_id: self.job_id.clone(),
            position,
            rows_since_checkpoint: 0,
            frequency: self.frequency,
            rows_done: self.rows_done,
            state,
            updated_at: chrono::Utc::now(),
        };
        self.store
            .save_checkpoint(&record)
            .map_err(ReportError::CheckpointPersist)?;

        self.position = record.position;
        self.rows_since_checkpoint = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::state::memory::MemoryStateStore;
    use model::core::value::Value;

    fn key(n: i64) -> BreakKey {
        BreakKey::new(vec![Value::Int(n)])
    }

    #[test]
    fn fresh_job_starts_at_beginning() {
        let store = Arc::new(MemoryStateStore::new());
        let mut cursor = CheckpointCursor::open(store, "P09325", 3).unwrap();
        assert_eq!(cursor.resume_point(), &ResumePoint::Beginning);
        assert!(cursor.resume_key().is_none());
        assert!(cursor.take_restored_state().is_none());
    }

    #[test]
    fn due_every_frequency_rows() {
        let store = Arc::new(MemoryStateStore::new());
        let mut cursor = CheckpointCursor::open(store.clone(), "P09325", 2).unwrap();

        cursor.advance();
        assert!(!cursor.due_for_persist());
        cursor.advance();
        assert!(cursor.due_for_persist());

        cursor.persist(&key(2), EngineSnapshot::default()).unwrap();
        assert!(!cursor.due_for_persist());
        assert_eq!(cursor.rows_since_checkpoint(), 0);

        let reopened = CheckpointCursor::open(store, "P09325", 2).unwrap();
        assert_eq!(reopened.resume_key(), Some(&key(2)));
        assert_eq!(reopened.rows_done(), 2);
    }

    #[test]
    fn completed_job_reopens_exhausted() {
        let store = Arc::new(MemoryStateStore::new());
        let mut cursor = CheckpointCursor::open(store.clone(), "P09325", 5).unwrap();
        cursor.advance();
        cursor.mark_complete(Some(key(1)), EngineSnapshot::default()).unwrap();

        let reopened = CheckpointCursor::open(store, "P09325", 5).unwrap();
        assert!(reopened.resume_point().is_exhausted());
        assert_eq!(reopened.rows_done(), 1);
    }

    #[test]
    fn zero_frequency_is_a_configuration_error() {
        let store = Arc::new(MemoryStateStore::new());
        assert!(matches!(
            CheckpointCursor::open(store, "P09325", 0),
            Err(ReportError::Configuration(_))
        ));
    }
}
