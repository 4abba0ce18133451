use crate::{
    accumulator::Accumulator,
    breaks::Subtotal,
    definition::ReportDefinition,
    error::{RenderError, ReportError},
    layout::{FixedWidthLine, PageHeader},
    paginator::Paginator,
    suppress::Suppressor,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDateTime;
use engine_config::settings::NO_DATA_LINE;
use engine_core::{
    connectors::sink::LineSink,
    metrics::ReportMetrics,
    state::models::{EngineSnapshot, TotalsSnapshot},
};
use model::{
    core::value::Value,
    records::{key::BreakKey, record::ReportRecord},
};
use std::cmp::Ordering;
use tracing::{debug, info};

pub const GRAND_TOTAL_LABEL: &str = "GRAND TOTAL";

/// Consumes an ordered row stream and writes the report: detail lines with
/// repeat suppression, nested subtotals on key transitions, pagination,
/// and the grand total at the end.
///
/// One engine serves exactly one run. Its state can be captured with
/// [`snapshot`](Self::snapshot) and handed to a later run through
/// [`restore`](Self::restore) so that groups left open by an interrupted
/// run are continued rather than restarted.
pub struct ControlBreakEngine<'a, R> {
    definition: &'a ReportDefinition<R>,
    sink: &'a mut dyn LineSink,
    header: PageHeader,
    run_at: NaiveDateTime,
    metrics: ReportMetrics,
    paginator: Paginator,
    suppressor: Suppressor,
    previous_keys: Vec<Option<BreakKey>>,
    accumulators: Vec<Accumulator>,
    grand_total: Accumulator,
    last_position: Option<BreakKey>,
    rows_processed: u64,
    lines_written: u64,
}

impl<'a, R: ReportRecord> ControlBreakEngine<'a, R> {
    pub fn new(
        definition: &'a ReportDefinition<R>,
        sink: &'a mut dyn LineSink,
        run_at: NaiveDateTime,
        metrics: ReportMetrics,
    ) -> Self {
        let levels = definition.levels.len();
        Self {
            definition,
            sink,
            header: definition.page_header(),
            run_at,
            metrics,
            paginator: Paginator::new(definition.lines_per_page, definition.page_footer.len()),
            suppressor: Suppressor::new(&definition.suppressed_fields, &definition.level_fields()),
            previous_keys: vec![None; levels],
            accumulators: vec![Accumulator::new(); levels],
            grand_total: Accumulator::new(),
            last_position: None,
            rows_processed: 0,
            lines_written: 0,
        }
    }

    /// Continues from state saved by an earlier run of the same job.
    pub fn restore(&mut self, snapshot: EngineSnapshot) -> Result<(), ReportError> {
        let levels = self.definition.levels.len();
        if snapshot.previous_keys.len() != levels || snapshot.level_totals.len() != levels {
            return Err(ReportError::Configuration(format!(
                "checkpoint holds state for {} break levels but the job defines {levels}",
                snapshot.previous_keys.len()
            )));
        }

        self.previous_keys = snapshot.previous_keys;
        self.accumulators = snapshot
            .level_totals
            .iter()
            .map(Accumulator::restore)
            .collect();
        self.grand_total = Accumulator::restore(&snapshot.grand_total);
        self.suppressor.restore(snapshot.suppression);
        Ok(())
    }

    /// Sets the position the next row must follow.
    pub fn resume_after(&mut self, position: Option<BreakKey>) {
        self.last_position = position;
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            previous_keys: self.previous_keys.clone(),
            level_totals: self.accumulators.iter().map(Accumulator::snapshot).collect(),
            grand_total: self.grand_total.snapshot(),
            suppression: self.suppressor.snapshot(),
        }
    }

    /// Processes one row and returns its composite position key.
    pub fn process(&mut self, row: &R) -> Result<BreakKey, ReportError> {
        let definition = self.definition;
        let position = definition.position_key(row);
        self.check_order(&position)?;
        let amount = self.amount_of(row)?;

        let keys: Vec<BreakKey> = definition.levels.iter().map(|l| l.extract(row)).collect();
        let mut broken = None;
        for (level, key) in keys.iter().enumerate() {
            if let Some(previous) = &self.previous_keys[level]
                && !previous.equals(key)?
            {
                broken = Some(level);
                break;
            }
        }

        if let Some(level) = broken {
            let forced = self.flush_levels(level)?;
            self.suppressor.reset_from_level(level);
            if forced {
                self.paginator.force_new_page();
            }
        }
        for (slot, key) in self.previous_keys.iter_mut().zip(keys) {
            *slot = Some(key);
        }

        self.ensure_room(1)?;
        let line = self.render_detail(row)?;
        self.emit(&line)?;

        for acc in &mut self.accumulators {
            acc.add(&amount);
        }
        self.grand_total.add(&amount);

        self.rows_processed += 1;
        self.metrics.increment_rows(1);
        self.last_position = Some(position.clone());
        Ok(position)
    }

    /// Closes every open group deepest first, then writes the grand total
    /// and the report footer. Also used when a run is stopped early.
    pub fn finish(&mut self) -> Result<(), ReportError> {
        let definition = self.definition;
        let width = definition.line_width;

        let had_open_groups = self.previous_keys.iter().any(Option::is_some);
        if had_open_groups {
            self.flush_levels(0)?;
        }
        self.previous_keys.iter_mut().for_each(|k| *k = None);
        self.suppressor.reset_all();

        if self.rows_processed == 0 && !had_open_groups && definition.emit_empty_report_line {
            self.write_block(&[FixedWidthLine::text(width, NO_DATA_LINE)])?;
        }

        let grand = definition.totals.render(
            GRAND_TOTAL_LABEL,
            &self.grand_total.snapshot(),
            definition.grand_debit_credit,
        )?;
        self.write_block(&grand)?;

        let footer: Vec<String> = definition
            .report_footer
            .iter()
            .map(|line| FixedWidthLine::text(width, line))
            .collect();
        if !footer.is_empty() {
            self.write_block(&footer)?;
        }
        self.write_page_footer()?;

        info!(
            job_id = %definition.job_id,
            rows = self.rows_processed,
            pages = self.paginator.page_number(),
            lines = self.lines_written,
            grand_total = %self.grand_total.total(),
            "Report totals written"
        );
        Ok(())
    }

    /// Makes every line written so far durable.
    pub fn flush_sink(&mut self) -> Result<(), ReportError> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn pages(&self) -> u32 {
        self.paginator.page_number()
    }

    pub fn grand_total(&self) -> TotalsSnapshot {
        self.grand_total.snapshot()
    }

    pub fn last_position(&self) -> Option<&BreakKey> {
        self.last_position.as_ref()
    }

    fn check_order(&self, position: &BreakKey) -> Result<(), ReportError> {
        if !self.definition.validate_order {
            return Ok(());
        }
        let Some(previous) = &self.last_position else {
            return Ok(());
        };

        let ordering = position.compare(previous)?;
        if ordering != Ordering::Greater {
            return Err(ReportError::OutOfOrder {
                row: self.rows_processed + 1,
                previous: previous.to_string(),
                current: position.to_string(),
            });
        }
        Ok(())
    }

    fn amount_of(&self, row: &R) -> Result<BigDecimal, ReportError> {
        let field = &self.definition.amount_field;
        match row.value(field) {
            None | Some(Value::Null) => Ok(BigDecimal::zero()),
            Some(value) => value.as_decimal().ok_or_else(|| {
                RenderError::InvalidValue {
                    field: field.clone(),
                    value: value.to_string(),
                    message: "amount is not numeric".into(),
                }
                .into()
            }),
        }
    }

    /// Writes and resets the subtotals of `from` and every deeper level,
    /// deepest first. Returns whether any of them forces a new page.
    fn flush_levels(&mut self, from: usize) -> Result<bool, ReportError> {
        let definition = self.definition;
        let mut forced = false;

        for level in (from..definition.levels.len()).rev() {
            let Some(key) = self.previous_keys[level].clone() else {
                continue;
            };
            let break_level = &definition.levels[level];
            let totals = self.accumulators[level].snapshot();
            let lines = break_level.render_subtotal(&Subtotal {
                level,
                name: break_level.name(),
                key: &key,
                totals: &totals,
            })?;
            self.write_block(&lines)?;
            self.accumulators[level].reset();
            self.metrics.increment_breaks(1);
            forced |= break_level.forces_new_page();

            debug!(
                level = break_level.name(),
                key = %key,
                count = totals.count,
                total = %totals.total,
                "Control break"
            );
        }
        Ok(forced)
    }

    fn render_detail(&mut self, row: &R) -> Result<String, ReportError> {
        let mut line = FixedWidthLine::new(self.definition.line_width);
        for field in &self.definition.detail {
            let value = row.value(&field.name).cloned().unwrap_or(Value::Null);
            if self.suppressor.suppress(&field.name, &value) {
                continue;
            }
            line.put_field(field, &value)?;
        }
        Ok(line.render())
    }

    /// Keeps `lines` together on one page.
    fn write_block(&mut self, lines: &[String]) -> Result<(), ReportError> {
        self.ensure_room(lines.len())?;
        for line in lines {
            self.emit(line)?;
        }
        Ok(())
    }

    fn ensure_room(&mut self, reserved: usize) -> Result<(), ReportError> {
        if self.paginator.needs_new_page(reserved) {
            self.new_page()?;
        }
        Ok(())
    }

    fn new_page(&mut self) -> Result<(), ReportError> {
        if self.paginator.page_number() > 0 {
            self.write_page_footer()?;
        }
        let page = self.paginator.start_page();
        for line in self.header.render(page, self.run_at) {
            self.emit(&line)?;
        }
        if self.definition.reprint_on_new_page {
            self.suppressor.reset_all();
        }
        self.metrics.increment_pages(1);
        debug!(page, "Page started");
        Ok(())
    }

    /// Footer lines occupy the space the paginator reserves below the body.
    fn write_page_footer(&mut self) -> Result<(), ReportError> {
        let width = self.definition.line_width;
        for text in &self.definition.page_footer {
            self.sink.write_line(&FixedWidthLine::text(width, text))?;
            self.lines_written += 1;
            self.metrics.increment_lines(1);
        }
        Ok(())
    }

    fn emit(&mut self, line: &str) -> Result<(), ReportError> {
        self.sink.write_line(line)?;
        self.paginator.record_line();
        self.lines_written += 1;
        self.metrics.increment_lines(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{breaks::BreakLevel, layout::TotalsLayout};
    use chrono::NaiveDate;
    use connectors::memory::sink::MemoryLineSink;
    use engine_config::settings::layout::{FieldFormat, FieldSettings, Justify};
    use model::records::row::{FieldValue, RowData};
    use std::str::FromStr;

    fn run_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn definition() -> ReportDefinition<RowData> {
        let amount = FieldSettings::new("amount", 45, 15)
            .with_justify(Justify::Right)
            .with_format(FieldFormat::amount());
        let totals = TotalsLayout {
            line_width: 60,
            label_width: 30,
            count_width: 7,
            amount: amount.clone(),
        };
        let detail = vec![
            FieldSettings::new("refund_type", 0, 4),
            FieldSettings::new("control_nbr", 5, 4).with_justify(Justify::Right),
            amount,
        ];
        let mut def = ReportDefinition::new("P09305", "REFUND REGISTER", 60, detail, "amount", totals.clone());
        def.levels = vec![
            BreakLevel::on_fields("type", vec!["refund_type".into()], "TOTAL TYPE", totals.clone(), false),
            BreakLevel::on_fields("control", vec!["control_nbr".into()], "TOTAL CONTROL", totals, false),
        ];
        def.tie_breaker = vec!["seq".into()];
        def
    }

    fn row(kind: &str, control: i64, seq: i64, amount: &str) -> RowData {
        RowData::new(
            "refunds",
            vec![
                FieldValue::new("refund_type", kind),
                FieldValue::new("control_nbr", control),
                FieldValue::new("seq", seq),
                FieldValue::new("amount", BigDecimal::from_str(amount).unwrap()),
            ],
        )
    }

    fn labels(lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .filter(|l| l.starts_with("TOTAL") || l.starts_with("GRAND"))
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn nested_subtotals_print_inner_first() {
        let def = definition();
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        for r in [
            row("PER", 1, 1, "100.00"),
            row("PER", 1, 2, "50.00"),
            row("PER", 2, 3, "30.00"),
            row("RET", 1, 4, "20.00"),
        ] {
            engine.process(&r).unwrap();
        }
        engine.finish().unwrap();
        assert_eq!(engine.grand_total().count, 4);
        drop(engine);

        assert_eq!(
            labels(sink.lines()),
            vec![
                "TOTAL CONTROL 1 2 150.00",
                "TOTAL CONTROL 2 1 30.00",
                "TOTAL TYPE PER 3 180.00",
                "TOTAL CONTROL 1 1 20.00",
                "TOTAL TYPE RET 1 20.00",
                "GRAND TOTAL 4 200.00",
            ]
        );
        assert!(sink.lines().iter().all(|l| l.chars().count() == 60));
        assert_eq!(sink.lines().last().unwrap().trim_end(), "*** END OF REPORT ***");
    }

    #[test]
    fn empty_stream_prints_no_data_line() {
        let def = definition();
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        engine.finish().unwrap();
        drop(engine);

        let lines: Vec<&str> = sink.lines().iter().map(|l| l.trim_end()).collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("P09305"));
        assert_eq!(lines[4], NO_DATA_LINE);
        assert_eq!(labels(sink.lines()), vec!["GRAND TOTAL 0 0.00"]);
        assert_eq!(lines[6], "*** END OF REPORT ***");
    }

    #[test]
    fn out_of_order_rows_are_rejected() {
        let def = definition();
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        engine.process(&row("RET", 1, 1, "1.00")).unwrap();
        let err = engine.process(&row("PER", 1, 2, "1.00")).unwrap_err();
        assert!(matches!(err, ReportError::OutOfOrder { row: 2, .. }));
    }

    #[test]
    fn repeated_position_is_rejected() {
        let def = definition();
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        engine.process(&row("PER", 1, 1, "1.00")).unwrap();
        let err = engine.process(&row("PER", 1, 1, "2.00")).unwrap_err();
        assert!(matches!(err, ReportError::OutOfOrder { row: 2, .. }));
    }

    #[test]
    fn mismatched_key_types_are_a_configuration_error() {
        let def = definition();
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        engine.process(&row("PER", 1, 1, "1.00")).unwrap();
        let odd = RowData::new(
            "refunds",
            vec![
                FieldValue::new("refund_type", 5i64),
                FieldValue::new("control_nbr", 1i64),
            ],
        );
        assert!(matches!(
            engine.process(&odd),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    fn snapshot_restores_open_groups() {
        let def = definition();
        let mut first = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut first, run_at(), ReportMetrics::new());
        engine.process(&row("PER", 1, 1, "100.00")).unwrap();
        let snapshot = engine.snapshot();
        drop(engine);

        let mut second = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut second, run_at(), ReportMetrics::new());
        engine.restore(snapshot).unwrap();
        engine.process(&row("PER", 1, 2, "50.00")).unwrap();
        engine.finish().unwrap();
        drop(engine);

        assert_eq!(
            labels(second.lines()),
            vec![
                "TOTAL CONTROL 1 2 150.00",
                "TOTAL TYPE PER 2 150.00",
                "GRAND TOTAL 2 150.00",
            ]
        );
    }

    #[test]
    fn suppressed_field_blanks_repeats_within_group() {
        let mut def = definition();
        def.suppressed_fields.insert("refund_type".into());
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        engine.process(&row("PER", 1, 1, "1.00")).unwrap();
        engine.process(&row("PER", 2, 2, "2.00")).unwrap();
        engine.process(&row("RET", 1, 3, "3.00")).unwrap();
        drop(engine);

        let details: Vec<&String> = sink
            .lines()
            .iter()
            .filter(|l| l.trim_end().ends_with(".00") && !l.starts_with("TOTAL"))
            .collect();
        assert!(details[0].starts_with("PER "));
        assert!(details[1].starts_with("    "));
        assert!(details[2].starts_with("RET "));
    }

    #[test]
    fn forced_level_starts_a_new_page() {
        let mut def = definition();
        let totals = def.totals.clone();
        def.levels[0] = BreakLevel::on_fields("type", vec!["refund_type".into()], "TOTAL TYPE", totals, false)
            .forcing_new_page(true);
        let mut sink = MemoryLineSink::new();
        let mut engine = ControlBreakEngine::new(&def, &mut sink, run_at(), ReportMetrics::new());
        engine.process(&row("PER", 1, 1, "1.00")).unwrap();
        engine.process(&row("RET", 1, 2, "2.00")).unwrap();
        assert_eq!(engine.pages(), 2);
        drop(engine);

        let headers = sink.lines().iter().filter(|l| l.starts_with("P09305")).count();
        assert_eq!(headers, 2);
    }
}
