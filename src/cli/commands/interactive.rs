//! Interactive REPL that walks an operator through the phases.
//!
//! Every phase run is confirmed first and the answer is written to the
//! workflow's audit trail.

use std::io::BufRead;

use anyhow::{Context, Result};
use console::{style, Term};
use std::process::ExitCode;
use tracing::warn;

use super::{lifecycle, phase, status, Engine};
use crate::cli::types::{PhaseOptions, StartArgs};
use crate::domain::models::Phase;
use crate::services::StatusReport;

const HELP: &str = "\
Commands:
  start              start a new workflow with the configured defaults
  status             show workflow progress
  continue           run the next phase
  phase <n>          run phase n (1-7)
  retry              retry the failed or interrupted phase
  results [n]        show stored results
  reset              archive and clear the workflow
  help               show this help
  exit               leave";

/// Print `text` and read one line from stdin. `None` at end of input.
async fn prompt(text: String) -> Result<Option<String>> {
    tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
        Term::stdout().write_str(&text)?;
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim().to_string()))
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read input")
}

/// Ask a yes/no question; `default` applies to an empty answer.
async fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = prompt(format!("{question} {hint} ")).await?.unwrap_or_default();
    Ok(match answer.to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    })
}

async fn record(engine: &Engine, action: &str, decision: &str, comment: &str) {
    if let Err(err) = engine.log_user_decision(action, decision, comment).await {
        warn!(error = %err, action, "failed to record operator decision");
    }
}

/// Ask before running `phase`; collect the phase 6 verdict too.
async fn confirm_phase(engine: &Engine, phase: Phase) -> Result<Option<PhaseOptions>> {
    let action = format!("execute_phase_{}", phase.number());
    if !confirm(&format!("Run {phase}: {}?", phase.title()), true).await? {
        record(engine, &action, "declined", "").await;
        return Ok(None);
    }
    record(engine, &action, "confirmed", "").await;

    let mut options = PhaseOptions::default();
    if phase == Phase::SubmitValidation {
        let answer = prompt("Approve the migration? [y/n, empty = policy] ".to_string())
            .await?
            .unwrap_or_default();
        match answer.to_lowercase().as_str() {
            "y" | "yes" => {
                options.approve = true;
                record(engine, "approve_migration", "approved", "operator").await;
            }
            "n" | "no" => {
                options.reject = true;
                record(engine, "approve_migration", "rejected", "operator").await;
            }
            _ => record(engine, "approve_migration", "policy", "").await,
        }
    }
    Ok(Some(options))
}

async fn next_phase(engine: &Engine) -> Option<Phase> {
    match engine.get_status().await {
        StatusReport::Active(summary) => Phase::from_number(summary.current_phase + 1),
        StatusReport::NoActiveWorkflow => None,
    }
}

async fn handle(engine: &Engine, line: &str) -> Result<bool> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let argument = words.next();

    match command {
        "" => {}
        "help" | "?" => println!("{HELP}"),
        "exit" | "quit" => return Ok(false),
        "start" => {
            lifecycle::start(engine, StartArgs::default(), false).await?;
        }
        "status" => {
            status::status(engine, false).await?;
        }
        "continue" | "next" => match next_phase(engine).await {
            Some(phase) => {
                if let Some(options) = confirm_phase(engine, phase).await? {
                    phase::continue_next(engine, &options, false).await?;
                }
            }
            None => {
                phase::continue_next(engine, &PhaseOptions::default(), false).await?;
            }
        },
        "phase" => {
            let number: u8 = argument
                .context("Usage: phase <n>")?
                .parse()
                .context("Phase must be a number from 1 to 7")?;
            let phase = Phase::from_number(number)
                .with_context(|| format!("Invalid phase number: {number} (must be 1-7)"))?;
            if let Some(options) = confirm_phase(engine, phase).await? {
                phase::run(engine, number, &options, false).await?;
            }
        }
        "retry" => {
            if confirm("Retry the failed phase?", true).await? {
                record(engine, "retry_phase", "confirmed", "").await;
                phase::retry(engine, &PhaseOptions::default(), false).await?;
            }
        }
        "results" => {
            let number = argument
                .map(str::parse::<u8>)
                .transpose()
                .context("Phase must be a number from 1 to 7")?;
            status::results(engine, number, false).await?;
        }
        "reset" => {
            if confirm("Archive and clear the active workflow?", false).await? {
                lifecycle::reset(engine, true, false).await?;
            }
        }
        other => println!("Unknown command '{other}'. Type `help` for the list."),
    }
    Ok(true)
}

pub async fn run(engine: &Engine) -> Result<ExitCode> {
    println!("{}", style("NFT IPFS to Filecoin migration").bold());
    println!("Type `help` for commands.\n");
    status::status(engine, false).await?;

    while let Some(line) = prompt(format!("\n{} ", style("nftmigrate>").cyan())).await? {
        match handle(engine, &line).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("{} {err:#}", style("Error:").red()),
        }
    }
    Ok(ExitCode::SUCCESS)
}
