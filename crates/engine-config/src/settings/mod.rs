use crate::settings::{
    error::SettingsError,
    layout::{FieldSettings, TotalsSettings},
    validated::ValidatedJob,
    validator::SettingsValidator,
};
use model::core::data_type::ColumnDef;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, path::Path};

pub mod error;
pub mod layout;
pub mod validated;
pub mod validator;

pub const DEFAULT_LINES_PER_PAGE: usize = 55;
pub const DEFAULT_LINE_WIDTH: usize = 132;
pub const DEFAULT_CHECKPOINT_FREQUENCY: u64 = 500;
pub const DEFAULT_FETCH_SIZE: usize = 1000;
/// Lines in the page header block: title, run date/time, captions, rule.
pub const PAGE_HEADER_LINES: usize = 4;
/// Narrowest line that still fits the page header.
pub const MIN_LINE_WIDTH: usize = 40;
pub const NO_DATA_LINE: &str = "NO DATA TO REPORT";
pub const END_OF_REPORT_LINE: &str = "*** END OF REPORT ***";

/// The JSON document describing one report job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    pub job_id: String,
    pub title: String,

    #[serde(default = "default_line_width")]
    pub line_width: usize,
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,
    #[serde(default = "default_checkpoint_frequency")]
    pub checkpoint_frequency: u64,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    #[serde(default)]
    pub suppressed_fields: BTreeSet<String>,
    #[serde(default = "default_true")]
    pub emit_empty_report_line: bool,
    /// Fail the run when the source violates its sort contract.
    #[serde(default = "default_true")]
    pub validate_order: bool,
    /// Print every suppressed field again on the first detail of a page.
    #[serde(default = "default_true")]
    pub reprint_on_new_page: bool,

    pub source: SourceSettings,
    #[serde(default)]
    pub levels: Vec<LevelSettings>,
    pub detail: Vec<FieldSettings>,
    #[serde(default)]
    pub totals: TotalsSettings,

    #[serde(default)]
    pub page_footer: Vec<String>,
    #[serde(default = "default_report_footer")]
    pub report_footer: Vec<String>,
}

/// Shape of the rows delivered by the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    pub columns: Vec<ColumnDef>,
    pub amount_field: String,
    /// Fields appended after the level keys to make the resume key unique.
    /// Validation requires at least one.
    #[serde(default)]
    pub tie_breaker: Vec<String>,
}

/// One control-break level, outermost first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSettings {
    pub name: String,
    pub fields: Vec<String>,
    pub label: String,
    #[serde(default)]
    pub forces_new_page: bool,
    #[serde(default)]
    pub debit_credit: bool,
}

impl JobSettings {
    pub fn from_json(source: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&source)
    }

    pub fn validate(self) -> Result<ValidatedJob, SettingsError> {
        SettingsValidator::new(&self).validate()
    }
}

fn default_line_width() -> usize {
    DEFAULT_LINE_WIDTH
}

fn default_lines_per_page() -> usize {
    DEFAULT_LINES_PER_PAGE
}

fn default_checkpoint_frequency() -> u64 {
    DEFAULT_CHECKPOINT_FREQUENCY
}

fn default_fetch_size() -> usize {
    DEFAULT_FETCH_SIZE
}

fn default_true() -> bool {
    true
}

fn default_report_footer() -> Vec<String> {
    vec![END_OF_REPORT_LINE.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "job_id": "P09305",
        "title": "REFUND REGISTER",
        "source": {
            "columns": [
                { "name": "refund_type", "type": "string" },
                { "name": "amount", "type": "decimal" }
            ],
            "amount_field": "amount"
        },
        "levels": [
            { "name": "refund_type", "fields": ["refund_type"], "label": "TOTAL REFUND TYPE" }
        ],
        "detail": [
            { "name": "refund_type", "column": 0, "width": 3 },
            { "name": "amount", "column": 10, "width": 14, "justify": "right", "format": { "kind": "amount" } }
        ]
    }"#;

    #[test]
    fn applies_defaults() {
        let settings = JobSettings::from_json(MINIMAL).unwrap();
        assert_eq!(settings.lines_per_page, DEFAULT_LINES_PER_PAGE);
        assert_eq!(settings.checkpoint_frequency, DEFAULT_CHECKPOINT_FREQUENCY);
        assert!(settings.emit_empty_report_line);
        assert!(settings.validate_order);
        assert_eq!(settings.report_footer, vec![END_OF_REPORT_LINE.to_string()]);
        assert!(!settings.levels[0].forces_new_page);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let settings = JobSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.job_id, "P09305");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = JobSettings::from_file("/nonexistent/job.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/job.json"));
    }
}
