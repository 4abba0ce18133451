use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_processed: AtomicU64,
    lines_written: AtomicU64,
    pages_written: AtomicU64,
    breaks_flushed: AtomicU64,
    checkpoints_saved: AtomicU64,
}

/// Per-run counters. Cheap to clone; clones share the same counters.
#[derive(Debug, Clone)]
pub struct ReportMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportMetricsSnapshot {
    pub rows_processed: u64,
    pub lines_written: u64,
    pub pages_written: u64,
    pub breaks_flushed: u64,
    pub checkpoints_saved: u64,
}

impl ReportMetrics {
    pub fn new() -> Self {
        ReportMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_rows(&self, count: u64) {
        self.inner.rows_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_lines(&self, count: u64) {
        self.inner.lines_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_pages(&self, count: u64) {
        self.inner.pages_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_breaks(&self, count: u64) {
        self.inner.breaks_flushed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_checkpoints(&self, count: u64) {
        self.inner
            .checkpoints_saved
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReportMetricsSnapshot {
        ReportMetricsSnapshot {
            rows_processed: self.inner.rows_processed.load(Ordering::Relaxed),
            lines_written: self.inner.lines_written.load(Ordering::Relaxed),
            pages_written: self.inner.pages_written.load(Ordering::Relaxed),
            breaks_flushed: self.inner.breaks_flushed.load(Ordering::Relaxed),
            checkpoints_saved: self.inner.checkpoints_saved.load(Ordering::Relaxed),
        }
    }
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = ReportMetrics::new();
        let handle = metrics.clone();
        handle.increment_rows(3);
        handle.increment_pages(1);
        metrics.increment_lines(12);

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_processed, 3);
        assert_eq!(snap.pages_written, 1);
        assert_eq!(snap.lines_written, 12);
        assert_eq!(snap.checkpoints_saved, 0);
    }
}
