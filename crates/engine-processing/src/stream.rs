use crate::error::ReportError;
use engine_core::connectors::source::RowSource;
use model::records::key::BreakKey;
use std::collections::VecDeque;
use tracing::debug;

/// Pulls rows one at a time from a paging row source. Each fetch asks for
/// rows strictly after the key of the last row handed out; a short batch
/// ends the stream.
pub struct RowStream<'a, S: RowSource + ?Sized> {
    source: &'a mut S,
    key_of: &'a dyn Fn(&S::Row) -> BreakKey,
    after: Option<BreakKey>,
    fetch_size: usize,
    buffer: VecDeque<S::Row>,
    exhausted: bool,
    fetches: u64,
}

impl<'a, S: RowSource + ?Sized> RowStream<'a, S> {
    pub fn new(
        source: &'a mut S,
        key_of: &'a dyn Fn(&S::Row) -> BreakKey,
        after: Option<BreakKey>,
        fetch_size: usize,
    ) -> Self {
        Self {
            source,
            key_of,
            after,
            fetch_size: fetch_size.max(1),
            buffer: VecDeque::new(),
            exhausted: false,
            fetches: 0,
        }
    }

    pub fn next_row(&mut self) -> Result<Option<S::Row>, ReportError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.refill()?;
        }
        Ok(self.buffer.pop_front())
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    fn refill(&mut self) -> Result<(), ReportError> {
        let batch = self.source.fetch(self.after.as_ref(), self.fetch_size)?;
        self.fetches += 1;
        if batch.len() < self.fetch_size {
            self.exhausted = true;
        }
        if let Some(last) = batch.last() {
            self.after = Some((self.key_of)(last));
        }
        debug!(rows = batch.len(), exhausted = self.exhausted, "Fetched batch");
        self.buffer.extend(batch);
        Ok(())
    }
}
