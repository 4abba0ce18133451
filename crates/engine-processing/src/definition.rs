use crate::{
    breaks::BreakLevel,
    error::ReportError,
    layout::{PageHeader, TotalsLayout},
};
use engine_config::settings::{
    END_OF_REPORT_LINE, MIN_LINE_WIDTH, PAGE_HEADER_LINES, layout::FieldSettings,
    validated::ValidatedJob,
};
use model::records::{key::BreakKey, record::ReportRecord};
use std::collections::{BTreeSet, HashSet};

/// Everything the engine needs to render one job: break levels, detail
/// layout, paging and checkpoint options.
pub struct ReportDefinition<R> {
    pub job_id: String,
    pub title: String,
    pub line_width: usize,
    pub lines_per_page: usize,
    pub checkpoint_frequency: u64,
    pub fetch_size: usize,
    pub levels: Vec<BreakLevel<R>>,
    /// Row fields appended to the level keys to form the resume key.
    pub tie_breaker: Vec<String>,
    pub amount_field: String,
    pub detail: Vec<FieldSettings>,
    pub totals: TotalsLayout,
    pub suppressed_fields: BTreeSet<String>,
    pub emit_empty_report_line: bool,
    pub validate_order: bool,
    pub reprint_on_new_page: bool,
    /// Print debit and credit lines under the grand total.
    pub grand_debit_credit: bool,
    pub page_footer: Vec<String>,
    pub report_footer: Vec<String>,
}

impl<R: ReportRecord + 'static> ReportDefinition<R> {
    pub fn from_settings(job: &ValidatedJob) -> Result<Self, ReportError> {
        let amount = job.amount_layout().cloned().ok_or_else(|| {
            ReportError::Configuration(format!(
                "amount field '{}' has no detail layout",
                job.amount_field
            ))
        })?;
        let totals = TotalsLayout {
            line_width: job.line_width,
            label_width: job.totals.label_width,
            count_width: job.totals.count_width,
            amount,
        };

        let levels = job
            .levels
            .iter()
            .map(|level| {
                BreakLevel::on_fields(
                    level.name.clone(),
                    level.fields.clone(),
                    level.label.clone(),
                    totals.clone(),
                    level.debit_credit,
                )
                .forcing_new_page(level.forces_new_page)
            })
            .collect();

        let definition = Self {
            job_id: job.job_id.clone(),
            title: job.title.clone(),
            line_width: job.line_width,
            lines_per_page: job.lines_per_page,
            checkpoint_frequency: job.checkpoint_frequency,
            fetch_size: job.fetch_size,
            levels,
            tie_breaker: job.tie_breaker.clone(),
            amount_field: job.amount_field.clone(),
            detail: job.detail.clone(),
            totals,
            suppressed_fields: job.suppressed_fields.clone(),
            emit_empty_report_line: job.emit_empty_report_line,
            validate_order: job.validate_order,
            reprint_on_new_page: job.reprint_on_new_page,
            grand_debit_credit: job.levels.iter().any(|l| l.debit_credit),
            page_footer: job.page_footer.clone(),
            report_footer: job.report_footer.clone(),
        };
        definition.validate()?;
        Ok(definition)
    }
}

impl<R> ReportDefinition<R> {
    /// A definition with no break levels and default options. Levels and
    /// options are set through the public fields.
    pub fn new(
        job_id: impl Into<String>,
        title: impl Into<String>,
        line_width: usize,
        detail: Vec<FieldSettings>,
        amount_field: impl Into<String>,
        totals: TotalsLayout,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            title: title.into(),
            line_width,
            lines_per_page: engine_config::settings::DEFAULT_LINES_PER_PAGE,
            checkpoint_frequency: engine_config::settings::DEFAULT_CHECKPOINT_FREQUENCY,
            fetch_size: engine_config::settings::DEFAULT_FETCH_SIZE,
            levels: Vec::new(),
            tie_breaker: Vec::new(),
            amount_field: amount_field.into(),
            detail,
            totals,
            suppressed_fields: BTreeSet::new(),
            emit_empty_report_line: true,
            validate_order: true,
            reprint_on_new_page: true,
            grand_debit_credit: false,
            page_footer: Vec::new(),
            report_footer: vec![END_OF_REPORT_LINE.to_string()],
        }
    }

    /// Structural checks run before any row is read.
    pub fn validate(&self) -> Result<(), ReportError> {
        let mut errors = Vec::new();

        if self.checkpoint_frequency == 0 {
            errors.push("checkpoint frequency must be greater than zero".to_string());
        }
        if self.fetch_size == 0 {
            errors.push("fetch size must be greater than zero".to_string());
        }
        if self.tie_breaker.is_empty() {
            errors.push(
                "at least one tie-breaker field is required so every row has a unique position"
                    .to_string(),
            );
        }
        if self.line_width < MIN_LINE_WIDTH {
            errors.push(format!("line width {} is below {MIN_LINE_WIDTH}", self.line_width));
        }
        if self.lines_per_page <= PAGE_HEADER_LINES + self.page_footer.len() {
            errors.push(format!(
                "{} lines per page leave no room for detail lines",
                self.lines_per_page
            ));
        }
        let mut names = HashSet::new();
        for level in &self.levels {
            if !names.insert(level.name()) {
                errors.push(format!("duplicate break level '{}'", level.name()));
            }
        }
        for field in &self.suppressed_fields {
            if !self.detail.iter().any(|f| f.name.eq_ignore_ascii_case(field)) {
                errors.push(format!("suppressed field '{field}' is not in the detail layout"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ReportError::Configuration(errors.join("; ")))
        }
    }

    pub fn page_header(&self) -> PageHeader {
        PageHeader {
            job_id: self.job_id.clone(),
            title: self.title.clone(),
            line_width: self.line_width,
            columns: self.detail.clone(),
        }
    }

    pub fn level_fields(&self) -> Vec<Vec<String>> {
        self.levels.iter().map(|l| l.fields().to_vec()).collect()
    }
}

impl<R: ReportRecord> ReportDefinition<R> {
    /// Composite stream position of a row: every level key in level order
    /// followed by the tie-breaker fields.
    pub fn position_key(&self, row: &R) -> BreakKey {
        let mut key = BreakKey::default();
        for level in &self.levels {
            key.extend(&level.extract(row));
        }
        key.extend(&row.key_of(&self.tie_breaker));
        key
    }
}
