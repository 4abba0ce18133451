use crate::settings::{
    LevelSettings,
    layout::{FieldSettings, TotalsSettings},
};
use model::core::data_type::ColumnDef;
use std::collections::BTreeSet;

/// Immutable, validated job configuration used for the whole run.
#[derive(Debug, Clone)]
pub struct ValidatedJob {
    pub job_id: String,
    pub title: String,
    pub line_width: usize,
    pub lines_per_page: usize,
    pub checkpoint_frequency: u64,
    pub fetch_size: usize,
    pub suppressed_fields: BTreeSet<String>,
    pub emit_empty_report_line: bool,
    pub validate_order: bool,
    pub reprint_on_new_page: bool,
    pub columns: Vec<ColumnDef>,
    pub amount_field: String,
    pub tie_breaker: Vec<String>,
    pub levels: Vec<LevelSettings>,
    pub detail: Vec<FieldSettings>,
    pub totals: TotalsSettings,
    pub page_footer: Vec<String>,
    pub report_footer: Vec<String>,
}

impl ValidatedJob {
    /// Fields forming the composite resume key: every level key in level
    /// order, then the tie-breaker fields.
    pub fn position_fields(&self) -> Vec<String> {
        self.levels
            .iter()
            .flat_map(|level| level.fields.iter().cloned())
            .chain(self.tie_breaker.iter().cloned())
            .collect()
    }

    /// Layout of the detail amount column; totals print under it.
    pub fn amount_layout(&self) -> Option<&FieldSettings> {
        self.detail
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(&self.amount_field))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
