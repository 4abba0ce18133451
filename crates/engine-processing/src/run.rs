use crate::{
    cursor::CheckpointCursor,
    definition::ReportDefinition,
    engine::ControlBreakEngine,
    error::ReportError,
    stop::{NeverStop, StopCheck},
    stream::RowStream,
};
use chrono::{Local, NaiveDateTime, Utc};
use engine_core::{
    connectors::{sink::LineSink, source::RowSource},
    metrics::ReportMetrics,
    state::{
        StateStore,
        models::{TotalsSnapshot, WalEntry},
    },
};
use model::{
    pagination::cursor::ResumePoint,
    records::{key::BreakKey, record::ReportRecord},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct RunOptions<'a> {
    /// Timestamp printed in every page header.
    pub run_at: NaiveDateTime,
    pub stop: &'a dyn StopCheck,
    pub metrics: ReportMetrics,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self {
            run_at: Local::now().naive_local(),
            stop: &NeverStop,
            metrics: ReportMetrics::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: String,
    /// Rows consumed by this run only.
    pub rows_processed: u64,
    /// Totals over every run of the job so far.
    pub grand_total: TotalsSnapshot,
    /// False when the run was stopped before the stream ended.
    pub completed: bool,
    pub pages: u32,
    pub lines_written: u64,
    pub resumed_from: ResumePoint,
}

/// Runs one job to the end of its stream or until `options.stop` fires.
///
/// The checkpoint store decides where the stream starts; progress is
/// persisted every `checkpoint_frequency` rows after flushing the sink. A
/// job whose stream was already exhausted renders the empty report with
/// its final grand total and fetches nothing.
pub fn run<S>(
    source: &mut S,
    store: Arc<dyn StateStore>,
    sink: &mut dyn LineSink,
    definition: &ReportDefinition<S::Row>,
    options: &RunOptions<'_>,
) -> Result<RunResult, ReportError>
where
    S: RowSource + ?Sized,
    S::Row: ReportRecord,
{
    let run_id = Uuid::new_v4().to_string();
    let job_id = definition.job_id.clone();
    definition.validate()?;

    let mut cursor =
        CheckpointCursor::open(store.clone(), &definition.job_id, definition.checkpoint_frequency)?;
    let resumed_from = cursor.resume_point().clone();
    info!(job_id = %job_id, run_id = %run_id, resume_from = ?resumed_from, "Report run started");
    journal(
        store.as_ref(),
        WalEntry::RunStart {
            job_id: job_id.clone(),
            run_id: run_id.clone(),
            resume_from: resumed_from.clone(),
            at: Utc::now(),
        },
    );

    let outcome = drive(source, store.as_ref(), sink, definition, options, &mut cursor, &run_id);

    match outcome {
        Ok(result) => {
            let entry = if result.completed {
                WalEntry::RunDone {
                    job_id: job_id.clone(),
                    run_id: run_id.clone(),
                    rows_processed: result.rows_processed,
                    at: Utc::now(),
                }
            } else {
                WalEntry::RunInterrupted {
                    job_id: job_id.clone(),
                    run_id: run_id.clone(),
                    rows_processed: result.rows_processed,
                    at: Utc::now(),
                }
            };
            journal(store.as_ref(), entry);
            info!(
                job_id = %job_id,
                run_id = %run_id,
                rows = result.rows_processed,
                pages = result.pages,
                lines = result.lines_written,
                completed = result.completed,
                "Report run finished"
            );
            Ok(RunResult {
                run_id,
                rows_processed: result.rows_processed,
                grand_total: result.grand_total,
                completed: result.completed,
                pages: result.pages,
                lines_written: result.lines_written,
                resumed_from,
            })
        }
        Err(err) => {
            // Keep what was written so far; the last saved checkpoint stays
            // the resume point.
            if let Err(flush_err) = sink.flush() {
                warn!(error = %flush_err, "Failed to flush report output after error");
            }
            error!(job_id = %job_id, run_id = %run_id, error = %err, "Report run failed");
            journal(
                store.as_ref(),
                WalEntry::RunFailed {
                    job_id,
                    run_id,
                    error: err.to_string(),
                    at: Utc::now(),
                },
            );
            Err(err)
        }
    }
}

fn drive<S>(
    source: &mut S,
    store: &dyn StateStore,
    sink: &mut dyn LineSink,
    definition: &ReportDefinition<S::Row>,
    options: &RunOptions<'_>,
    cursor: &mut CheckpointCursor,
    run_id: &str,
) -> Result<RunOutcome, ReportError>
where
    S: RowSource + ?Sized,
    S::Row: ReportRecord,
{
    let mut engine = ControlBreakEngine::new(definition, sink, options.run_at, options.metrics.clone());
    if let Some(state) = cursor.take_restored_state() {
        engine.restore(state)?;
    }
    engine.resume_after(cursor.resume_key().cloned());

    if cursor.resume_point().is_exhausted() {
        info!(job_id = %definition.job_id, "Stream already consumed; rendering final totals only");
        engine.finish()?;
        return Ok(outcome_of(&engine, true));
    }

    let key_of = |row: &S::Row| definition.position_key(row);
    let mut stream = RowStream::new(source, &key_of, cursor.resume_key().cloned(), definition.fetch_size);

    let mut stopped = false;
    loop {
        if options.stop.should_stop() {
            info!(job_id = %definition.job_id, rows = engine.rows_processed(), "Stop requested");
            stopped = true;
            break;
        }
        let Some(row) = stream.next_row()? else {
            break;
        };

        let position = engine.process(&row)?;
        cursor.advance();
        if cursor.due_for_persist() {
            engine.flush_sink()?;
            cursor.persist(&position, engine.snapshot())?;
            options.metrics.increment_checkpoints(1);
            journal(
                store,
                WalEntry::CheckpointSaved {
                    job_id: definition.job_id.clone(),
                    run_id: run_id.to_string(),
                    rows_done: cursor.rows_done(),
                    at: Utc::now(),
                },
            );
        }
    }

    if stopped {
        // Persist the open groups before printing totals-so-far so the
        // next run continues them.
        if let Some(position) = engine.last_position().cloned()
            && engine.rows_processed() > 0
        {
            engine.flush_sink()?;
            cursor.persist(&position, engine.snapshot())?;
            options.metrics.increment_checkpoints(1);
        }
        engine.finish()?;
        engine.flush_sink()?;
        return Ok(outcome_of(&engine, false));
    }

    engine.finish()?;
    engine.flush_sink()?;
    let last: Option<BreakKey> = engine.last_position().cloned();
    cursor.mark_complete(last, engine.snapshot())?;
    options.metrics.increment_checkpoints(1);
    Ok(outcome_of(&engine, true))
}

struct RunOutcome {
    rows_processed: u64,
    grand_total: TotalsSnapshot,
    completed: bool,
    pages: u32,
    lines_written: u64,
}

fn outcome_of<R: ReportRecord>(engine: &ControlBreakEngine<'_, R>, completed: bool) -> RunOutcome {
    RunOutcome {
        rows_processed: engine.rows_processed(),
        grand_total: engine.grand_total(),
        completed,
        pages: engine.pages(),
        lines_written: engine.lines_written(),
    }
}

fn journal(store: &dyn StateStore, entry: WalEntry) {
    if let Err(e) = store.append_wal(&entry) {
        warn!(job_id = entry.job_id(), error = %e, "Failed to append WAL entry");
    }
}
