use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use model::{
    core::value::Value,
    pagination::cursor::ResumePoint,
    records::key::BreakKey,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of an accumulator.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TotalsSnapshot {
    pub count: u64,
    pub total: BigDecimal,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

/// Engine state needed to continue open groups after a restart.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    /// Last key seen at each level, outermost first. `None` before the
    /// first row and after the stream has been flushed.
    pub previous_keys: Vec<Option<BreakKey>>,
    pub level_totals: Vec<TotalsSnapshot>,
    pub grand_total: TotalsSnapshot,
    /// Raw value last printed for each suppressed field.
    pub suppression: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckpointRecord {
    pub job_id: String,
    pub position: ResumePoint,
    pub rows_since_checkpoint: u64,
    pub frequency: u64,
    /// Rows consumed by every run of the job so far.
    pub rows_done: u64,
    pub state: EngineSnapshot,
    pub updated_at: DateTime<Utc>,
}

impl CheckpointRecord {
    pub fn is_exhausted(&self) -> bool {
        self.position.is_exhausted()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum WalEntry {
    RunStart {
        job_id: String,
        run_id: String,
        resume_from: ResumePoint,
        at: DateTime<Utc>,
    },
    CheckpointSaved {
        job_id: String,
        run_id: String,
        rows_done: u64,
        at: DateTime<Utc>,
    },
    RunInterrupted {
        job_id: String,
        run_id: String,
        rows_processed: u64,
        at: DateTime<Utc>,
    },
    RunDone {
        job_id: String,
        run_id: String,
        rows_processed: u64,
        at: DateTime<Utc>,
    },
    RunFailed {
        job_id: String,
        run_id: String,
        error: String,
        at: DateTime<Utc>,
    },
}

impl WalEntry {
    pub fn job_id(&self) -> &str {
        match self {
            WalEntry::RunStart { job_id, .. }
            | WalEntry::CheckpointSaved { job_id, .. }
            | WalEntry::RunInterrupted { job_id, .. }
            | WalEntry::RunDone { job_id, .. }
            | WalEntry::RunFailed { job_id, .. } => job_id,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            WalEntry::RunStart { run_id, .. }
            | WalEntry::CheckpointSaved { run_id, .. }
            | WalEntry::RunInterrupted { run_id, .. }
            | WalEntry::RunDone { run_id, .. }
            | WalEntry::RunFailed { run_id, .. } => run_id,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            WalEntry::RunStart { at, .. }
            | WalEntry::CheckpointSaved { at, .. }
            | WalEntry::RunInterrupted { at, .. }
            | WalEntry::RunDone { at, .. }
            | WalEntry::RunFailed { at, .. } => *at,
        }
    }
}
