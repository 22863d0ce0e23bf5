//! Output formatting for status and state lines

use anyhow::Error;
use colored::Colorize;
use serde_json::json;
use std::process::ExitCode;
use sw_watchdog::{LifecycleState, Status};

/// Render a failure status as one line.
#[must_use]
pub fn format_status(status: &Status, json: bool) -> String {
    if json {
        json!({
            "event": "failure",
            "missed_source_id": status.missed_source_id,
            "stamp": status.stamp().as_secs_f64(),
            "frame_id": status.header.frame_id,
        })
        .to_string()
    } else {
        format!(
            "{} source {} missed its lease (detected at {})",
            "FAILURE".red().bold(),
            status.missed_source_id.to_string().bold(),
            status.stamp()
        )
    }
}

/// Render the current lifecycle state as one line.
#[must_use]
pub fn format_state(state: LifecycleState, json: bool) -> String {
    if json {
        json!({ "event": "state", "state": state.as_str() }).to_string()
    } else {
        let name = match state {
            LifecycleState::Active => state.as_str().green(),
            LifecycleState::Inactive => state.as_str().yellow(),
            LifecycleState::Unconfigured | LifecycleState::Finalized => state.as_str().dimmed(),
        };
        format!("{} {}", "state:".bold(), name)
    }
}

/// Print a failure status to stdout.
pub fn print_status(status: &Status, json: bool) {
    println!("{}", format_status(status, json));
}

/// Print the lifecycle state to stdout.
pub fn print_state(state: LifecycleState, json: bool) {
    println!("{}", format_state(state, json));
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "event": "error",
        "message": error.to_string(),
    });
    println!("{error_json}");
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print a failed run's error and map the outcome to an exit code.
#[must_use]
pub fn finish(result: anyhow::Result<()>, json: bool) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json {
                print_error_json(&err);
            } else {
                print_error_human(&err);
            }
            ExitCode::FAILURE
        }
    }
}
