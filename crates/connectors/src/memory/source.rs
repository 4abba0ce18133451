use engine_core::{connectors::source::RowSource, error::SourceError};
use model::records::{key::BreakKey, record::ReportRecord};
use std::cmp::Ordering;

/// Serves a pre-sorted vector of rows with the same "strictly after key"
/// contract as a database cursor.
pub struct MemoryRowSource<R> {
    rows: Vec<R>,
    position_fields: Vec<String>,
    fetch_calls: usize,
}

impl<R: ReportRecord + Clone> MemoryRowSource<R> {
    pub fn new(rows: Vec<R>, position_fields: Vec<String>) -> Self {
        Self {
            rows,
            position_fields,
            fetch_calls: 0,
        }
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls
    }
}

impl<R: ReportRecord + Clone> RowSource for MemoryRowSource<R> {
    type Row = R;

    fn fetch(&mut self, after: Option<&BreakKey>, limit: usize) -> Result<Vec<R>, SourceError> {
        self.fetch_calls += 1;
        let mut batch = Vec::with_capacity(limit.min(self.rows.len()));
        for row in &self.rows {
            if batch.len() == limit {
                break;
            }
            if let Some(after) = after {
                let key = row.key_of(&self.position_fields);
                let ordering = key
                    .compare(after)
                    .map_err(|e| SourceError::Fetch(e.to_string()))?;
                if ordering != Ordering::Greater {
                    continue;
                }
            }
            batch.push(row.clone());
        }
        Ok(batch)
    }
}
