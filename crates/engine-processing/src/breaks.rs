use crate::{error::RenderError, layout::TotalsLayout};
use engine_core::state::models::TotalsSnapshot;
use model::records::{key::BreakKey, record::ReportRecord};

pub type KeyExtractor<R> = Box<dyn Fn(&R) -> BreakKey + Send + Sync>;
pub type SubtotalRenderer =
    Box<dyn Fn(&Subtotal<'_>) -> Result<Vec<String>, RenderError> + Send + Sync>;

/// What a subtotal renderer gets when its level breaks.
#[derive(Debug)]
pub struct Subtotal<'a> {
    pub level: usize,
    pub name: &'a str,
    /// Key of the group being closed.
    pub key: &'a BreakKey,
    pub totals: &'a TotalsSnapshot,
}

/// One nesting level of the report, outermost first.
pub struct BreakLevel<R> {
    name: String,
    fields: Vec<String>,
    forces_new_page: bool,
    extract: KeyExtractor<R>,
    render_subtotal: SubtotalRenderer,
}

impl<R> BreakLevel<R> {
    pub fn new(name: impl Into<String>, extract: KeyExtractor<R>, render_subtotal: SubtotalRenderer) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            forces_new_page: false,
            extract,
            render_subtotal,
        }
    }

    /// Fields making up the key, used to bind suppressed fields to levels.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn forcing_new_page(mut self, forces_new_page: bool) -> Self {
        self.forces_new_page = forces_new_page;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn forces_new_page(&self) -> bool {
        self.forces_new_page
    }

    pub fn extract(&self, row: &R) -> BreakKey {
        (self.extract)(row)
    }

    pub fn render_subtotal(&self, subtotal: &Subtotal<'_>) -> Result<Vec<String>, RenderError> {
        (self.render_subtotal)(subtotal)
    }
}

impl<R: ReportRecord + 'static> BreakLevel<R> {
    /// A level keyed on named row fields whose subtotal prints
    /// `"{label} {key}"` on the standard totals layout.
    pub fn on_fields(
        name: impl Into<String>,
        fields: Vec<String>,
        label: impl Into<String>,
        layout: TotalsLayout,
        debit_credit: bool,
    ) -> Self {
        let label = label.into();
        let key_fields = fields.clone();
        let extract: KeyExtractor<R> = Box::new(move |row: &R| row.key_of(&key_fields));
        let render: SubtotalRenderer = Box::new(move |subtotal: &Subtotal<'_>| {
            let text = format!("{} {}", label, subtotal.key);
            layout.render(text.trim_end(), subtotal.totals, debit_credit)
        });
        Self::new(name, extract, render).with_fields(fields)
    }
}

impl<R> std::fmt::Debug for BreakLevel<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakLevel")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("forces_new_page", &self.forces_new_page)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use engine_config::settings::layout::{FieldFormat, FieldSettings, Justify};
    use model::{
        core::value::Value,
        records::row::{FieldValue, RowData},
    };

    fn layout() -> TotalsLayout {
        TotalsLayout {
            line_width: 50,
            label_width: 25,
            count_width: 5,
            amount: FieldSettings::new("amount", 35, 15)
                .with_justify(Justify::Right)
                .with_format(FieldFormat::amount()),
        }
    }

    #[test]
    fn field_level_extracts_and_labels() {
        let level: BreakLevel<RowData> = BreakLevel::on_fields(
            "type",
            vec!["refund_type".into()],
            "TOTAL TYPE",
            layout(),
            false,
        );
        let row = RowData::new("refunds", vec![FieldValue::new("refund_type", "PER")]);
        let key = level.extract(&row);
        assert_eq!(key, BreakKey::new(vec![Value::from("PER")]));

        let totals = TotalsSnapshot {
            count: 3,
            total: BigDecimal::from(180),
            ..Default::default()
        };
        let lines = level
            .render_subtotal(&Subtotal {
                level: 0,
                name: level.name(),
                key: &key,
                totals: &totals,
            })
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("TOTAL TYPE PER"));
        assert!(lines[0].ends_with("180.00"));
    }

    #[test]
    fn custom_extractor_and_renderer() {
        let level: BreakLevel<(String, i64)> = BreakLevel::new(
            "clerk",
            Box::new(|row: &(String, i64)| BreakKey::new(vec![Value::from(row.0.as_str())])),
            Box::new(|s: &Subtotal<'_>| Ok(vec![format!("{}={}", s.name, s.totals.count)])),
        )
        .forcing_new_page(true);

        assert!(level.forces_new_page());
        let key = level.extract(&("JDOE".to_string(), 7));
        let lines = level
            .render_subtotal(&Subtotal {
                level: 0,
                name: "clerk",
                key: &key,
                totals: &TotalsSnapshot::default(),
            })
            .unwrap();
        assert_eq!(lines, vec!["clerk=0".to_string()]);
    }
}
