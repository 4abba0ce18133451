use crate::{
    error::ProgressError,
    state::{StateStore, models::WalEntry},
};
use chrono::{DateTime, Utc};
use model::pagination::cursor::ResumePoint;
use serde::Serialize;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct ProgressService {
    pub store: Arc<dyn StateStore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    Idle,
    Running,
    Interrupted,
    Done,
    Failed,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "Idle",
            ProgressStage::Running => "Running",
            ProgressStage::Interrupted => "Interrupted",
            ProgressStage::Done => "Done",
            ProgressStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStatus {
    pub stage: ProgressStage,
    pub position: ResumePoint,
    pub rows_done: u64,
    pub last_run_id: Option<String>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        ProgressService { store }
    }

    /// Derives a job's state from its journal, falling back on the
    /// checkpoint alone when the journal is empty.
    pub fn job_status(&self, job_id: &str) -> Result<ProgressStatus, ProgressError> {
        let wal_entries = self
            .store
            .iter_wal(job_id)
            .map_err(|e| ProgressError::Wal(e.to_string()))?;
        let checkpoint = self
            .store
            .load_checkpoint(job_id)
            .map_err(|e| ProgressError::LoadCheckpoint(e.to_string()))?;

        let mut stage = None;
        let mut last_run_id = None;
        let mut last_event_at = None;
        let mut last_error = None;

        for entry in &wal_entries {
            stage = Some(match entry {
                WalEntry::RunStart { .. } | WalEntry::CheckpointSaved { .. } => {
                    last_error = None;
                    ProgressStage::Running
                }
                WalEntry::RunInterrupted { .. } => ProgressStage::Interrupted,
                WalEntry::RunDone { .. } => ProgressStage::Done,
                WalEntry::RunFailed { error, .. } => {
                    last_error = Some(error.clone());
                    ProgressStage::Failed
                }
            });
            last_run_id = Some(entry.run_id().to_string());
            last_event_at = Some(entry.at());
        }

        let (position, rows_done) = match &checkpoint {
            Some(cp) => (cp.position.clone(), cp.rows_done),
            None => (ResumePoint::Beginning, 0),
        };

        let stage = match (stage, &checkpoint) {
            (Some(stage), _) => stage,
            (None, Some(cp)) if cp.is_exhausted() => ProgressStage::Done,
            (None, Some(_)) => ProgressStage::Interrupted,
            (None, None) => ProgressStage::Idle,
        };

        Ok(ProgressStatus {
            stage,
            position,
            rows_done,
            last_run_id,
            last_event_at,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        models::{CheckpointRecord, EngineSnapshot},
        sled_store::SledStateStore,
    };
    use model::{core::value::Value, records::key::BreakKey};
    use tempfile::tempdir;

    const JOB_ID: &str = "P09315";

    fn checkpoint(position: ResumePoint, rows: u64) -> CheckpointRecord {
        CheckpointRecord {
            job_id: JOB_ID.to_string(),
            position,
            rows_since_checkpoint: 0,
            frequency: 5,
            rows_done: rows,
            state: EngineSnapshot::default(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn open_store(dir: &std::path::Path) -> Arc<dyn StateStore> {
        Arc::new(SledStateStore::open(dir).expect("open sled"))
    }

    #[test]
    fn reports_idle_for_unknown_job() {
        let dir = tempdir().unwrap();
        let service = ProgressService::new(open_store(dir.path()));

        let status = service.job_status(JOB_ID).unwrap();
        assert_eq!(status.stage, ProgressStage::Idle);
        assert_eq!(status.position, ResumePoint::Beginning);
    }

    #[test]
    fn reports_interrupted_run_with_position() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let service = ProgressService::new(store.clone());
        let key = BreakKey::new(vec![Value::from("PER")]);

        store
            .append_wal(&WalEntry::RunStart {
                job_id: JOB_ID.into(),
                run_id: "run-1".into(),
                resume_from: ResumePoint::Beginning,
                at: chrono::Utc::now(),
            })
            .unwrap();
        store
            .save_checkpoint(&checkpoint(ResumePoint::After(key.clone()), 10))
            .unwrap();
        store
            .append_wal(&WalEntry::RunInterrupted {
                job_id: JOB_ID.into(),
                run_id: "run-1".into(),
                rows_processed: 10,
                at: chrono::Utc::now(),
            })
            .unwrap();

        let status = service.job_status(JOB_ID).unwrap();
        assert_eq!(status.stage, ProgressStage::Interrupted);
        assert_eq!(status.rows_done, 10);
        assert_eq!(status.position, ResumePoint::After(key));
        assert_eq!(status.last_run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn reports_failure_message() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let service = ProgressService::new(store.clone());

        store
            .append_wal(&WalEntry::RunFailed {
                job_id: JOB_ID.into(),
                run_id: "run-2".into(),
                error: "checkpoint store unavailable".into(),
                at: chrono::Utc::now(),
            })
            .unwrap();

        let status = service.job_status(JOB_ID).unwrap();
        assert_eq!(status.stage, ProgressStage::Failed);
        assert_eq!(
            status.last_error.as_deref(),
            Some("checkpoint store unavailable")
        );
    }

    #[test]
    fn checkpoint_alone_marks_finished_job_done() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let service = ProgressService::new(store.clone());

        store
            .save_checkpoint(&checkpoint(ResumePoint::Exhausted { last: None }, 4))
            .unwrap();

        let status = service.job_status(JOB_ID).unwrap();
        assert_eq!(status.stage, ProgressStage::Done);
        assert_eq!(status.rows_done, 4);
    }
}
