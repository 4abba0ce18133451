use crate::{
    error::CliError,
    shutdown::{ExitStatus, stop_on_signal},
};
use clap::Parser;
use commands::Commands;
use engine_runtime::execution::{
    executor::{self, JobRequest},
    utils::default_state_dir,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "cbreport",
    version = "0.1.0",
    about = "Control-break report engine with checkpoint resume"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so JSON output on stdout stays clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            eprintln!("Error: {err}");
            ExitStatus::Failed
        }
    };
    std::process::exit(code.code());
}

async fn execute(cli: Cli) -> Result<ExitStatus, CliError> {
    match cli.command {
        Commands::Run {
            settings,
            input,
            output,
            state_dir,
            json,
        } => {
            let stop = CancellationToken::new();
            stop_on_signal(stop.clone());

            let request = JobRequest {
                settings,
                input,
                output,
                state_dir: state_dir_or_default(state_dir)?,
            };
            let result = executor::run(request, stop.clone()).await?;
            output::print_run(&result, json)?;

            if !result.completed && stop.is_cancelled() {
                warn!("Report interrupted; rerun the same command to resume");
                return Ok(ExitStatus::Interrupted);
            }
        }
        Commands::Validate { settings } => {
            let job = executor::validate(&settings)?;
            info!(job_id = %job.job_id, "Settings are valid");
            println!(
                "Settings for job '{}' are valid: {} break level(s), {} detail field(s)",
                job.job_id,
                job.levels.len(),
                job.detail.len()
            );
        }
        Commands::Progress {
            job,
            state_dir,
            json,
        } => {
            let status = executor::progress(&state_dir_or_default(state_dir)?, &job)?;
            output::print_progress(&job, &status, json)?;
        }
        Commands::Reset { job, state_dir } => {
            executor::reset(&state_dir_or_default(state_dir)?, &job)?;
            println!("Checkpoint for job '{job}' cleared");
        }
    }

    Ok(ExitStatus::Done)
}

fn state_dir_or_default(state_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match state_dir {
        Some(dir) => Ok(dir),
        None => Ok(default_state_dir()?),
    }
}
