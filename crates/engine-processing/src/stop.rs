use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Cooperative stop request, polled once per row.
pub trait StopCheck: Send + Sync {
    fn should_stop(&self) -> bool;
}

/// Never asks the run to stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverStop;

impl StopCheck for NeverStop {
    fn should_stop(&self) -> bool {
        false
    }
}

impl StopCheck for CancellationToken {
    fn should_stop(&self) -> bool {
        self.is_cancelled()
    }
}

impl StopCheck for AtomicBool {
    fn should_stop(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Stops after a fixed number of polls. Handy for interrupting a run at
/// an exact row.
#[derive(Debug)]
pub struct StopAfter {
    remaining: std::sync::atomic::AtomicU64,
}

impl StopAfter {
    pub fn rows(rows: u64) -> Self {
        Self {
            remaining: std::sync::atomic::AtomicU64::new(rows),
        }
    }
}

impl StopCheck for StopAfter {
    fn should_stop(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_err()
    }
}
