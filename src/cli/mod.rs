//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

use std::process::ExitCode;

use console::style;

use crate::domain::errors::DomainError;

pub use types::{Cli, Commands, PhaseOptions, StartArgs};

/// Print a command error and pick the exit code.
///
/// Precondition problems exit with 2 so scripts can tell them apart from
/// failures of the run itself.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ExitCode {
    let precondition = err
        .downcast_ref::<DomainError>()
        .is_some_and(DomainError::is_precondition);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "precondition": precondition,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("Error:").red().bold());
    }

    if precondition {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}
