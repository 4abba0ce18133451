use crate::{
    error::StateStoreError,
    state::{
        StateStore, ensure_not_stale,
        models::{CheckpointRecord, WalEntry},
    },
};
use std::{collections::HashMap, sync::Mutex};

/// Process-local state store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStateStore {
    checkpoints: Mutex<HashMap<String, CheckpointRecord>>,
    wal: Mutex<Vec<WalEntry>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load_checkpoint(&self, job_id: &str) -> Result<Option<CheckpointRecord>, StateStoreError> {
        let checkpoints = self
            .checkpoints
            .lock()
            .map_err(|e| StateStoreError::LoadCheckpoint(e.to_string()))?;
        Ok(checkpoints.get(job_id).cloned())
    }

    fn save_checkpoint(&self, cp: &CheckpointRecord) -> Result<(), StateStoreError> {
        let mut checkpoints = self
            .checkpoints
            .lock()
            .map_err(|e| StateStoreError::SaveCheckpoint(e.to_string()))?;
        if let Some(existing) = checkpoints.get(&cp.job_id) {
            ensure_not_stale(existing, cp)?;
        }
        checkpoints.insert(cp.job_id.clone(), cp.clone());
        Ok(())
    }

    fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError> {
        self.wal
            .lock()
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?
            .push(entry.clone());
        Ok(())
    }

    fn iter_wal(&self, job_id: &str) -> Result<Vec<WalEntry>, StateStoreError> {
        let wal = self
            .wal
            .lock()
            .map_err(|e| StateStoreError::IterateWal(e.to_string()))?;
        Ok(wal.iter().filter(|e| e.job_id() == job_id).cloned().collect())
    }

    fn clear(&self, job_id: &str) -> Result<(), StateStoreError> {
        let clear_err = |message: String| StateStoreError::Clear {
            job_id: job_id.to_string(),
            message,
        };
        self.checkpoints
            .lock()
            .map_err(|e| clear_err(e.to_string()))?
            .remove(job_id);
        self.wal
            .lock()
            .map_err(|e| clear_err(e.to_string()))?
            .retain(|e| e.job_id() != job_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::models::EngineSnapshot;
    use model::pagination::cursor::ResumePoint;

    #[test]
    fn applies_the_same_stale_guard_as_sled() {
        let store = MemoryStateStore::new();
        let mut cp = CheckpointRecord {
            job_id: "P09345".into(),
            position: ResumePoint::Beginning,
            rows_since_checkpoint: 0,
            frequency: 10,
            rows_done: 10,
            state: EngineSnapshot::default(),
            updated_at: chrono::Utc::now(),
        };
        store.save_checkpoint(&cp).unwrap();

        cp.rows_done = 9;
        assert!(matches!(
            store.save_checkpoint(&cp),
            Err(StateStoreError::StaleCheckpoint { .. })
        ));

        store.clear("P09345").unwrap();
        store.save_checkpoint(&cp).unwrap();
        assert_eq!(store.load_checkpoint("P09345").unwrap().unwrap().rows_done, 9);
    }
}
