use crate::{error::RuntimeError, execution::factory};
use chrono::Local;
use engine_config::settings::validated::ValidatedJob;
use engine_core::{metrics::ReportMetrics, state::StateStore};
use engine_processing::{
    definition::ReportDefinition,
    run::{RunOptions, RunResult, run},
};
use model::records::row::RowData;
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs the job on a blocking worker; the engine, the CSV reader and the
/// file sink all do synchronous I/O. Cancelling `cancel` stops the run at
/// the next row boundary.
pub async fn spawn(
    job: ValidatedJob,
    input: PathBuf,
    output: PathBuf,
    state: Arc<dyn StateStore>,
    cancel: CancellationToken,
) -> Result<RunResult, RuntimeError> {
    info!(job_id = %job.job_id, "Launching report worker");

    let handle = tokio::task::spawn_blocking(move || {
        run_job(&job, &input, &output, state, &cancel)
    });

    handle.await?.inspect_err(|err| error!("Report worker error: {}", err))
}

fn run_job(
    job: &ValidatedJob,
    input: &std::path::Path,
    output: &std::path::Path,
    state: Arc<dyn StateStore>,
    cancel: &CancellationToken,
) -> Result<RunResult, RuntimeError> {
    let definition: ReportDefinition<RowData> = ReportDefinition::from_settings(job)?;
    let mut source = factory::create_source(job, input)?;
    let mut sink = factory::create_sink(state.as_ref(), &job.job_id, output)?;

    let options = RunOptions {
        run_at: Local::now().naive_local(),
        stop: cancel,
        metrics: ReportMetrics::new(),
    };
    let result = run(&mut source, state, &mut sink, &definition, &options)?;

    let metrics = options.metrics.snapshot();
    info!(
        job_id = %job.job_id,
        rows_read = source.rows_read(),
        breaks = metrics.breaks_flushed,
        checkpoints = metrics.checkpoints_saved,
        "Report worker finished"
    );
    Ok(result)
}
