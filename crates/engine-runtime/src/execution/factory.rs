use crate::error::RuntimeError;
use connectors::file::{csv::source::CsvRowSource, text::sink::FileLineSink};
use engine_config::settings::validated::ValidatedJob;
use engine_core::state::{StateStore, sled_store::SledStateStore};
use std::{path::Path, sync::Arc};
use tracing::info;

pub fn open_state(dir: &Path) -> Result<Arc<SledStateStore>, RuntimeError> {
    Ok(Arc::new(SledStateStore::open(dir)?))
}

pub fn create_source(job: &ValidatedJob, input: &Path) -> Result<CsvRowSource, RuntimeError> {
    Ok(CsvRowSource::open(input, &job.columns, job.position_fields())?)
}

/// Appends to the existing report when the job has an unfinished
/// checkpoint, so a resumed run continues the same output file.
/// Otherwise the output starts over.
pub fn create_sink(
    state: &dyn StateStore,
    job_id: &str,
    output: &Path,
) -> Result<FileLineSink, RuntimeError> {
    let resuming = state
        .load_checkpoint(job_id)?
        .is_some_and(|checkpoint| !checkpoint.is_exhausted());

    let sink = if resuming {
        info!(job_id, path = %output.display(), "Appending to existing report output");
        FileLineSink::append(output)?
    } else {
        info!(job_id, path = %output.display(), "Writing new report output");
        FileLineSink::create(output)?
    };
    Ok(sink)
}
