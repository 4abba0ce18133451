use crate::settings::{
    JobSettings, MIN_LINE_WIDTH, PAGE_HEADER_LINES, error::SettingsError,
    layout::FieldFormat, validated::ValidatedJob,
};
use std::collections::HashSet;
use tracing::info;

/// Checks a job's settings for internal consistency before any row is read.
pub struct SettingsValidator<'a> {
    settings: &'a JobSettings,
}

impl<'a> SettingsValidator<'a> {
    pub fn new(settings: &'a JobSettings) -> Self {
        Self { settings }
    }

    pub fn validate(&self) -> Result<ValidatedJob, SettingsError> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_page(&mut errors);
        self.validate_columns(&mut errors);
        self.validate_levels(&mut errors);
        self.validate_detail(&mut errors);
        self.validate_totals(&mut errors);

        if !errors.is_empty() {
            return Err(SettingsError::ValidationFailed(errors));
        }

        let validated = self.build();
        info!(
            job_id = %validated.job_id,
            levels = validated.levels.len(),
            lines_per_page = validated.lines_per_page,
            checkpoint_frequency = validated.checkpoint_frequency,
            "Job settings validated"
        );
        Ok(validated)
    }

    fn validate_page(&self, errors: &mut Vec<String>) {
        let s = self.settings;
        if s.job_id.trim().is_empty() {
            errors.push("job_id must not be empty".into());
        }
        if s.line_width < MIN_LINE_WIDTH {
            errors.push(format!(
                "line_width {} is narrower than the minimum of {MIN_LINE_WIDTH}",
                s.line_width
            ));
        }
        let fixed = PAGE_HEADER_LINES + s.page_footer.len();
        if s.lines_per_page <= fixed {
            errors.push(format!(
                "lines_per_page {} leaves no room for detail lines (header and footer take {fixed})",
                s.lines_per_page
            ));
        }
        if s.checkpoint_frequency == 0 {
            errors.push("checkpoint_frequency must be greater than zero".into());
        }
        if s.fetch_size == 0 {
            errors.push("fetch_size must be greater than zero".into());
        }
    }

    fn validate_columns(&self, errors: &mut Vec<String>) {
        let source = &self.settings.source;
        if source.columns.is_empty() {
            errors.push("source declares no columns".into());
        }

        let mut seen = HashSet::new();
        for column in &source.columns {
            if !seen.insert(column.name.to_ascii_lowercase()) {
                errors.push(format!("duplicate source column '{}'", column.name));
            }
        }

        match self.column_type(&source.amount_field) {
            Some(ty) if ty.is_numeric() => {}
            Some(ty) => errors.push(format!(
                "amount field '{}' must be numeric, found {ty}",
                source.amount_field
            )),
            None => errors.push(format!(
                "amount field '{}' is not a source column",
                source.amount_field
            )),
        }

        if source.tie_breaker.is_empty() {
            errors.push(
                "source declares no tie_breaker fields; rows sharing break keys would be skipped on fetch"
                    .into(),
            );
        }
        for field in &source.tie_breaker {
            if self.column_type(field).is_none() {
                errors.push(format!("tie-breaker field '{field}' is not a source column"));
            }
        }
    }

    fn validate_levels(&self, errors: &mut Vec<String>) {
        let mut names = HashSet::new();
        for level in &self.settings.levels {
            if !names.insert(level.name.to_ascii_lowercase()) {
                errors.push(format!("duplicate break level '{}'", level.name));
            }
            if level.fields.is_empty() {
                errors.push(format!("break level '{}' has no key fields", level.name));
            }
            for field in &level.fields {
                if self.column_type(field).is_none() {
                    errors.push(format!(
                        "break level '{}' references unknown field '{field}'",
                        level.name
                    ));
                }
            }
        }
    }

    fn validate_detail(&self, errors: &mut Vec<String>) {
        let s = self.settings;
        if s.detail.is_empty() {
            errors.push("detail layout declares no fields".into());
        }

        for (i, field) in s.detail.iter().enumerate() {
            if field.width == 0 {
                errors.push(format!("detail field '{}' has zero width", field.name));
            }
            if field.end() > s.line_width {
                errors.push(format!(
                    "detail field '{}' ends at column {} beyond line width {}",
                    field.name,
                    field.end(),
                    s.line_width
                ));
            }
            match self.column_type(&field.name) {
                None => errors.push(format!(
                    "detail field '{}' is not a source column",
                    field.name
                )),
                Some(ty) if field.format.is_numeric() && !ty.is_numeric() => {
                    errors.push(format!(
                        "detail field '{}' uses a numeric format but the column is {ty}",
                        field.name
                    ))
                }
                Some(_) => {}
            }
            for other in &s.detail[i + 1..] {
                if field.overlaps(other) {
                    errors.push(format!(
                        "detail fields '{}' and '{}' overlap",
                        field.name, other.name
                    ));
                }
            }
        }

        for name in &s.suppressed_fields {
            if !s.detail.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
                errors.push(format!(
                    "suppressed field '{name}' is not part of the detail layout"
                ));
            }
        }
    }

    fn validate_totals(&self, errors: &mut Vec<String>) {
        let s = self.settings;
        let Some(amount) = s
            .detail
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(&s.source.amount_field))
        else {
            errors.push(format!(
                "amount field '{}' must appear in the detail layout",
                s.source.amount_field
            ));
            return;
        };

        if !matches!(amount.format, FieldFormat::Amount { .. }) {
            errors.push(format!(
                "amount field '{}' must use the amount format",
                amount.name
            ));
        }

        let needed = s.totals.label_width + 1 + s.totals.count_width + 1;
        if needed > amount.column {
            errors.push(format!(
                "totals label ({}) and count ({}) do not fit before the amount column at {}",
                s.totals.label_width, s.totals.count_width, amount.column
            ));
        }
        if s.totals.count_width == 0 {
            errors.push("totals count_width must be greater than zero".into());
        }
    }

    fn column_type(&self, name: &str) -> Option<model::core::data_type::DataType> {
        self.settings
            .source
            .columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.data_type)
    }

    fn build(&self) -> ValidatedJob {
        let s = self.settings.clone();
        ValidatedJob {
            job_id: s.job_id,
            title: s.title,
            line_width: s.line_width,
            lines_per_page: s.lines_per_page,
            checkpoint_frequency: s.checkpoint_frequency,
            fetch_size: s.fetch_size,
            suppressed_fields: s.suppressed_fields,
            emit_empty_report_line: s.emit_empty_report_line,
            validate_order: s.validate_order,
            reprint_on_new_page: s.reprint_on_new_page,
            columns: s.source.columns,
            amount_field: s.source.amount_field,
            tie_breaker: s.source.tie_breaker,
            levels: s.levels,
            detail: s.detail,
            totals: s.totals,
            page_footer: s.page_footer,
            report_footer: s.report_footer,
        }
    }
}
