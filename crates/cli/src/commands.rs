use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a report job, resuming from its last checkpoint
    Run {
        #[arg(long, help = "Job settings file (JSON)")]
        settings: PathBuf,

        #[arg(long, help = "CSV input, sorted by the job's break keys")]
        input: PathBuf,

        #[arg(long, help = "Report output file")]
        output: PathBuf,

        #[arg(long, help = "Checkpoint directory (default ~/.cbreport/state)")]
        state_dir: Option<PathBuf>,

        #[arg(long, help = "If set, prints the run summary as JSON")]
        json: bool,
    },
    /// Check a settings file without running anything
    Validate {
        #[arg(long, help = "Job settings file (JSON)")]
        settings: PathBuf,
    },
    Progress {
        #[arg(long, help = "Job ID to inspect")]
        job: String,

        #[arg(long, help = "Checkpoint directory (default ~/.cbreport/state)")]
        state_dir: Option<PathBuf>,

        #[arg(
            long,
            help = "If set, prints the progress information as JSON instead of a table"
        )]
        json: bool,
    },
    /// Discard a job's checkpoint so the next run starts from the beginning
    Reset {
        #[arg(long, help = "Job ID to reset")]
        job: String,

        #[arg(long, help = "Checkpoint directory (default ~/.cbreport/state)")]
        state_dir: Option<PathBuf>,
    },
}
