use crate::{core::value::Value, records::key::BreakKey};

/// Field access the report engine needs from a row. Rows are otherwise
/// opaque to the engine.
pub trait ReportRecord {
    fn value(&self, field: &str) -> Option<&Value>;

    /// Builds a key from the named fields. Missing fields become `Null`.
    fn key_of(&self, fields: &[String]) -> BreakKey {
        BreakKey::new(
            fields
                .iter()
                .map(|f| self.value(f).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }
}
