use crate::{
    error::RuntimeError,
    execution::{factory, workers},
};
use engine_config::settings::{JobSettings, validated::ValidatedJob};
use engine_core::{
    progress::{ProgressService, ProgressStatus},
    state::{StateStore, sled_store::SledStateStore},
};
use engine_processing::run::RunResult;
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything needed to run one report job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// JSON job settings.
    pub settings: PathBuf,
    /// CSV input, sorted by the job's break keys.
    pub input: PathBuf,
    /// Report output file.
    pub output: PathBuf,
    pub state_dir: PathBuf,
}

pub async fn run(request: JobRequest, cancel: CancellationToken) -> Result<RunResult, RuntimeError> {
    ReportExecutor::new(request, cancel)?.execute().await
}

/// Loads and validates a settings file without touching any state.
pub fn validate(settings: &std::path::Path) -> Result<ValidatedJob, RuntimeError> {
    Ok(JobSettings::from_file(settings)?.validate()?)
}

pub fn progress(state_dir: &std::path::Path, job_id: &str) -> Result<ProgressStatus, RuntimeError> {
    let state: Arc<dyn StateStore> = factory::open_state(state_dir)?;
    Ok(ProgressService::new(state).job_status(job_id)?)
}

/// Forgets a job's checkpoint and journal so the next run starts over.
pub fn reset(state_dir: &std::path::Path, job_id: &str) -> Result<(), RuntimeError> {
    let state = factory::open_state(state_dir)?;
    state.clear(job_id)?;
    info!(job_id, "Job state cleared");
    Ok(())
}

struct ReportExecutor {
    request: JobRequest,
    job: ValidatedJob,
    state: Arc<SledStateStore>,
    cancel: CancellationToken,
}

impl ReportExecutor {
    fn new(request: JobRequest, cancel: CancellationToken) -> Result<Self, RuntimeError> {
        let job = validate(&request.settings)?;
        let state = factory::open_state(&request.state_dir)?;
        Ok(Self {
            request,
            job,
            state,
            cancel,
        })
    }

    async fn execute(self) -> Result<RunResult, RuntimeError> {
        let start_time = std::time::Instant::now();
        info!(
            job_id = %self.job.job_id,
            input = %self.request.input.display(),
            output = %self.request.output.display(),
            "Starting report job"
        );

        if self.cancel.is_cancelled() {
            warn!(job_id = %self.job.job_id, "Shutdown requested before the job started");
        }

        let job_id = self.job.job_id.clone();
        let result = workers::spawn(
            self.job,
            self.request.input,
            self.request.output,
            self.state,
            self.cancel,
        )
        .await?;

        info!(
            job_id = %job_id,
            completed = result.completed,
            rows = result.rows_processed,
            "Report job finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::progress::ProgressStage;
    use std::fs;
    use tempfile::TempDir;

    const SETTINGS: &str = r#"{
        "job_id": "P09320",
        "title": "REFUND REGISTER",
        "line_width": 60,
        "lines_per_page": 30,
        "checkpoint_frequency": 2,
        "source": {
            "columns": [
                { "name": "refund_type", "type": "string" },
                { "name": "seq", "type": "int" },
                { "name": "amount", "type": "decimal" }
            ],
            "amount_field": "amount",
            "tie_breaker": ["seq"]
        },
        "levels": [
            { "name": "type", "fields": ["refund_type"], "label": "TOTAL TYPE" }
        ],
        "detail": [
            { "name": "refund_type", "column": 0, "width": 4 },
            { "name": "seq", "column": 5, "width": 4, "justify": "right" },
            { "name": "amount", "column": 45, "width": 15, "justify": "right", "format": { "kind": "amount" } }
        ]
    }"#;

    const INPUT: &str = "refund_type,seq,amount\nPER,1,100.00\nPER,2,50.00\nRET,3,20.00\n";

    fn request(dir: &TempDir) -> JobRequest {
        let settings = dir.path().join("job.json");
        let input = dir.path().join("refunds.csv");
        fs::write(&settings, SETTINGS).unwrap();
        fs::write(&input, INPUT).unwrap();
        JobRequest {
            settings,
            input,
            output: dir.path().join("report.txt"),
            state_dir: dir.path().join("state"),
        }
    }

    #[tokio::test]
    async fn runs_job_end_to_end() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir);

        let result = run(request.clone(), CancellationToken::new()).await.unwrap();
        assert!(result.completed);
        assert_eq!(result.rows_processed, 3);

        let report = fs::read_to_string(&request.output).unwrap();
        assert!(report.lines().any(|l| l.starts_with("TOTAL TYPE PER")));
        let grand = report.lines().find(|l| l.starts_with("GRAND TOTAL")).unwrap();
        assert!(grand.trim_end().ends_with("170.00"));

        let status = progress(&request.state_dir, "P09320").unwrap();
        assert_eq!(status.stage, ProgressStage::Done);
        assert_eq!(status.rows_done, 3);
    }

    #[tokio::test]
    async fn cancelled_job_resumes_into_same_output() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stopped = run(request.clone(), cancel).await.unwrap();
        assert!(!stopped.completed);
        assert_eq!(stopped.rows_processed, 0);
        assert_eq!(
            progress(&request.state_dir, "P09320").unwrap().stage,
            ProgressStage::Interrupted
        );

        let resumed = run(request.clone(), CancellationToken::new()).await.unwrap();
        assert!(resumed.completed);
        assert_eq!(resumed.grand_total.count, 3);
    }

    #[tokio::test]
    async fn reset_forgets_finished_job() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir);
        run(request.clone(), CancellationToken::new()).await.unwrap();

        reset(&request.state_dir, "P09320").unwrap();
        let status = progress(&request.state_dir, "P09320").unwrap();
        assert_eq!(status.stage, ProgressStage::Idle);

        let again = run(request, CancellationToken::new()).await.unwrap();
        assert_eq!(again.rows_processed, 3);
    }

    #[test]
    fn validate_reports_bad_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.json");
        fs::write(&path, SETTINGS.replace("\"checkpoint_frequency\": 2", "\"checkpoint_frequency\": 0")).unwrap();
        assert!(matches!(validate(&path), Err(RuntimeError::Settings(_))));
    }
}
