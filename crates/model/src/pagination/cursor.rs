use crate::records::key::BreakKey;
use serde::{Deserialize, Serialize};

/// Where a job's row stream resumes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ResumePoint {
    /// No checkpoint recorded; read from the first row.
    Beginning,

    /// Resume strictly after this composite key.
    After(BreakKey),

    /// The stream was fully consumed by a previous run. Re-running the job
    /// must not fetch anything.
    Exhausted { last: Option<BreakKey> },
}

impl ResumePoint {
    /// The exclusive lower bound a row source should honour, if any.
    pub fn after_key(&self) -> Option<&BreakKey> {
        match self {
            ResumePoint::Beginning => None,
            ResumePoint::After(key) => Some(key),
            ResumePoint::Exhausted { last } => last.as_ref(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, ResumePoint::Exhausted { .. })
    }
}
