use crate::{
    error::StateStoreError,
    state::{
        StateStore, ensure_not_stale,
        models::{CheckpointRecord, WalEntry},
    },
};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

/// Sled-backed state store. Records are stored as JSON so decimal totals
/// keep their exact scale.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn chk_key(job_id: &str) -> String {
        format!("chk:{}", job_id)
    }

    #[inline]
    fn wal_prefix(job_id: &str) -> String {
        format!("wal:{}:", job_id)
    }
}

impl StateStore for SledStateStore {
    fn load_checkpoint(&self, job_id: &str) -> Result<Option<CheckpointRecord>, StateStoreError> {
        let key = Self::chk_key(job_id);
        match self
            .db
            .get(key)
            .map_err(|e| StateStoreError::LoadCheckpoint(e.to_string()))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_checkpoint(&self, cp: &CheckpointRecord) -> Result<(), StateStoreError> {
        let key = Self::chk_key(&cp.job_id);
        let new_bytes = serde_json::to_vec(cp)?;

        // Check-then-set in one transaction so a stale writer cannot slip in
        // between the comparison and the insert.
        let result = self.db.transaction::<_, _, StateStoreError>(|tx_db| {
            if let Some(existing_bytes) = tx_db.get(&key)? {
                let existing: CheckpointRecord = serde_json::from_slice(&existing_bytes)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
                ensure_not_stale(&existing, cp).map_err(ConflictableTransactionError::Abort)?;
            }
            tx_db.insert(key.as_str(), new_bytes.as_slice())?;
            Ok(())
        });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => {
                return Err(StateStoreError::SaveCheckpoint(e.to_string()));
            }
        }

        self.db
            .flush()
            .map_err(|e| StateStoreError::SaveCheckpoint(e.to_string()))?;
        debug!(job_id = %cp.job_id, rows_done = cp.rows_done, "Checkpoint stored");
        Ok(())
    }

    fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError> {
        let seq = self
            .db
            .generate_id()
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        // Zero padded so lexicographic key order matches append order.
        let key = format!("{}{:020}", Self::wal_prefix(entry.job_id()), seq);
        let value = serde_json::to_vec(entry)?;

        self.db
            .insert(key, value)
            .map_err(|e| StateStoreError::AppendWal(e.to_string()))?;
        Ok(())
    }

    fn iter_wal(&self, job_id: &str) -> Result<Vec<WalEntry>, StateStoreError> {
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(Self::wal_prefix(job_id)) {
            let (_key, value) = item.map_err(|e| StateStoreError::IterateWal(e.to_string()))?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    fn clear(&self, job_id: &str) -> Result<(), StateStoreError> {
        let clear_err = |e: sled::Error| StateStoreError::Clear {
            job_id: job_id.to_string(),
            message: e.to_string(),
        };

        self.db.remove(Self::chk_key(job_id)).map_err(clear_err)?;
        for item in self.db.scan_prefix(Self::wal_prefix(job_id)) {
            let (key, _) = item.map_err(clear_err)?;
            self.db.remove(key).map_err(clear_err)?;
        }
        self.db.flush().map_err(clear_err)?;
        Ok(())
    }
}
