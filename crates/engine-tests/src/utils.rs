#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use connectors::memory::{sink::MemoryLineSink, source::MemoryRowSource};
use engine_config::settings::{END_OF_REPORT_LINE, JobSettings, NO_DATA_LINE};
use engine_core::{
    error::StateStoreError,
    metrics::ReportMetrics,
    state::{
        StateStore,
        models::{CheckpointRecord, WalEntry},
    },
};
use engine_processing::{
    definition::ReportDefinition,
    error::ReportError,
    run::{RunOptions, RunResult, run},
    stop::StopCheck,
};
use model::records::row::{FieldValue, RowData};
use serde_json::{Value as Json, json};
use std::{str::FromStr, sync::Arc};

pub const JOB_ID: &str = "P09305";

/// Column where the amount field starts; totals print under it.
pub const AMOUNT_COLUMN: usize = 45;
pub const AMOUNT_WIDTH: usize = 15;

/// Settings for the refund register used across the scenarios: two break
/// levels (refund type, control number) and a sequence tie-breaker.
pub fn refund_settings(lines_per_page: usize, checkpoint_frequency: u64) -> Json {
    json!({
        "job_id": JOB_ID,
        "title": "REFUND REGISTER",
        "line_width": 60,
        "lines_per_page": lines_per_page,
        "checkpoint_frequency": checkpoint_frequency,
        "fetch_size": 7,
        "source": {
            "columns": [
                { "name": "refund_type", "type": "string" },
                { "name": "control_nbr", "type": "int" },
                { "name": "seq", "type": "int" },
                { "name": "amount", "type": "decimal" }
            ],
            "amount_field": "amount",
            "tie_breaker": ["seq"]
        },
        "levels": [
            { "name": "type", "fields": ["refund_type"], "label": "TOTAL TYPE" },
            { "name": "control", "fields": ["control_nbr"], "label": "TOTAL CONTROL" }
        ],
        "detail": [
            { "name": "refund_type", "caption": "TYPE", "column": 0, "width": 4 },
            { "name": "control_nbr", "caption": "CONTROL", "column": 5, "width": 7, "format": { "kind": "number", "zero_pad": true } },
            { "name": "seq", "column": 13, "width": 6, "justify": "right" },
            { "name": "amount", "column": AMOUNT_COLUMN, "width": AMOUNT_WIDTH, "justify": "right", "format": { "kind": "amount" } }
        ]
    })
}

pub fn definition(settings: &Json) -> ReportDefinition<RowData> {
    let job = JobSettings::from_json(&settings.to_string())
        .unwrap()
        .validate()
        .unwrap();
    ReportDefinition::from_settings(&job).unwrap()
}

pub fn run_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 31)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

pub fn refund(kind: &str, control: i64, seq: i64, amount: &str) -> RowData {
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

/// `count` rows already sorted by type, control number and sequence, with
/// a deterministic mix of positive and negative amounts.
pub fn refund_rows(count: i64) -> Vec<RowData> {
    const TYPES: [&str; 3] = ["ADJ", "PER", "RET"];
    (0..count)
        .map(|seq| {
            let kind = TYPES[(seq * 3 / count.max(1)) as usize];
            let control = seq / 4 + 1;
            let cents = (seq * 3719 % 50_000) - 10_000;
            let amount = BigDecimal::new(cents.into(), 2);
            refund(kind, control, seq + 1, &amount.to_string())
        })
        .collect()
}

/// The same rows as CSV text with a header line.
pub fn refund_csv(rows: &[RowData]) -> String {
    let mut out = String::from("refund_type,control_nbr,seq,amount\n");
    for row in rows {
        let fields: Vec<String> = ["refund_type", "control_nbr", "seq", "amount"]
            .iter()
            .map(|f| row.get_value(f).to_string())
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

pub fn position_fields(def: &ReportDefinition<RowData>) -> Vec<String> {
    let mut fields = def.level_fields().concat();
    fields.extend(def.tie_breaker.iter().cloned());
    fields
}

pub fn options(stop: &dyn StopCheck) -> RunOptions<'_> {
    RunOptions {
        run_at: run_at(),
        stop,
        metrics: ReportMetrics::new(),
    }
}

pub struct Captured {
    pub result: Result<RunResult, ReportError>,
    pub sink: MemoryLineSink,
}

impl Captured {
    pub fn lines(&self) -> &[String] {
        self.sink.lines()
    }

    pub fn result(&self) -> &RunResult {
        self.result.as_ref().unwrap()
    }
}

/// One run over in-memory rows against `store`.
pub fn run_rows(
    def: &ReportDefinition<RowData>,
    store: Arc<dyn StateStore>,
    rows: &[RowData],
    stop: &dyn StopCheck,
) -> Captured {
    let mut source = MemoryRowSource::new(rows.to_vec(), position_fields(def));
    let mut sink = MemoryLineSink::new();
    let result = run(&mut source, store, &mut sink, def, &options(stop));
    Captured { result, sink }
}

/// Lines that are neither page furniture nor totals.
pub fn detail_lines(def: &ReportDefinition<RowData>, lines: &[String]) -> Vec<String> {
    let header = def.page_header().render(1, run_at());
    lines
        .iter()
        .filter(|l| !l.starts_with(&def.job_id) && !l.starts_with("RUN DATE:"))
        .filter(|l| !header[2..].contains(*l))
        .filter(|l| !is_total(l))
        .filter(|l| {
            let t = l.trim_end();
            t != NO_DATA_LINE && t != END_OF_REPORT_LINE
        })
        .cloned()
        .collect()
}

pub fn is_total(line: &str) -> bool {
    line.starts_with("TOTAL") || line.starts_with("GRAND TOTAL")
}

pub fn total_lines(lines: &[String]) -> Vec<String> {
    lines.iter().filter(|l| is_total(l)).cloned().collect()
}

/// Amount printed in the amount column of a detail or totals line.
pub fn amount_in(line: &str) -> BigDecimal {
    let text = line[AMOUNT_COLUMN..AMOUNT_COLUMN + AMOUNT_WIDTH]
        .trim()
        .replace(',', "");
    BigDecimal::from_str(&text).unwrap()
}

/// Splits output into pages at every page header.
pub fn pages<'a>(def: &ReportDefinition<RowData>, lines: &'a [String]) -> Vec<&'a [String]> {
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with(&def.job_id))
        .map(|(i, _)| i)
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            &lines[start..end]
        })
        .collect()
}

/// Store whose checkpoint writes always fail.
#[derive(Default)]
pub struct FailingStateStore;

impl StateStore for FailingStateStore {
    fn load_checkpoint(&self, _job_id: &str) -> Result<Option<CheckpointRecord>, StateStoreError> {
        Ok(None)
    }

    fn save_checkpoint(&self, _checkpoint: &CheckpointRecord) -> Result<(), StateStoreError> {
        Err(StateStoreError::SaveCheckpoint("disk full".into()))
    }

    fn append_wal(&self, _entry: &WalEntry) -> Result<(), StateStoreError> {
        Ok(())
    }

    fn iter_wal(&self, _job_id: &str) -> Result<Vec<WalEntry>, StateStoreError> {
        Ok(Vec::new())
    }

    fn clear(&self, _job_id: &str) -> Result<(), StateStoreError> {
        Ok(())
    }
}
