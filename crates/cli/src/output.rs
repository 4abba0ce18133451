use crate::error::CliError;
use engine_core::{progress::ProgressStatus, state::models::TotalsSnapshot};
use engine_processing::run::RunResult;
use model::pagination::cursor::ResumePoint;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    run_id: &'a str,
    completed: bool,
    rows_processed: u64,
    pages: u32,
    lines_written: u64,
    grand_total: &'a TotalsSnapshot,
    resumed_from: &'a ResumePoint,
}

pub fn print_run(result: &RunResult, as_json: bool) -> Result<(), CliError> {
    if as_json {
        let summary = RunSummary {
            run_id: &result.run_id,
            completed: result.completed,
            rows_processed: result.rows_processed,
            pages: result.pages,
            lines_written: result.lines_written,
            grand_total: &result.grand_total,
            resumed_from: &result.resumed_from,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let state = if result.completed { "completed" } else { "interrupted" };
    println!("Run {} {state}", result.run_id);
    println!("-----------------------------");
    println!("{:<16} {}", "Resumed from", describe(&result.resumed_from));
    println!("{:<16} {}", "Rows processed", result.rows_processed);
    println!("{:<16} {}", "Pages", result.pages);
    println!("{:<16} {}", "Lines written", result.lines_written);
    println!("{:<16} {}", "Grand count", result.grand_total.count);
    println!("{:<16} {}", "Grand total", result.grand_total.total);
    Ok(())
}

pub fn print_progress(job: &str, status: &ProgressStatus, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }

    println!("Progress for job '{job}':");
    println!("-----------------------------");
    println!("{:<16} {}", "Stage", status.stage);
    println!("{:<16} {}", "Rows done", status.rows_done);
    println!("{:<16} {}", "Position", describe(&status.position));
    println!(
        "{:<16} {}",
        "Last run",
        status.last_run_id.as_deref().unwrap_or("n/a")
    );
    let last_event = status
        .last_event_at
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string());
    println!("{:<16} {}", "Last event", last_event);
    if let Some(error) = &status.last_error {
        println!("{:<16} {}", "Last error", error);
    }
    Ok(())
}

fn describe(position: &ResumePoint) -> String {
    match position {
        ResumePoint::Beginning => "beginning".to_string(),
        ResumePoint::After(key) => format!("after [{key}]"),
        ResumePoint::Exhausted { .. } => "end of input".to_string(),
    }
}
