//! `start`, `reset` and `decide`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use console::{style, Term};
use serde::Serialize;

use super::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::StartArgs;
use crate::services::state_service::ResetOutcome;
use crate::services::workflow_engine::{StartedWorkflow, StatusReport};

impl CommandOutput for StartedWorkflow {
    fn to_human(&self) -> String {
        let config = &self.config;
        let mut lines = vec![
            format!("{} Started workflow {}", style("✓").green(), self.workflow_id),
            format!(
                "  NFT contract: {}",
                if config.nft_contract.is_empty() { "(not set)" } else { config.nft_contract.as_str() }
            ),
            format!("  Tokens:       {}..={}", config.start_token_id, config.end_token_id),
            format!(
                "  Validator:    {}",
                config.validator_address.as_deref().unwrap_or("(not set)")
            ),
        ];
        lines.push(format!(
            "\nNext: {}: {} (run `nftmigrate continue`)",
            self.next_phase,
            self.next_phase.title()
        ));
        lines.join("\n")
    }
}

pub async fn start(engine: &Engine, args: StartArgs, json: bool) -> Result<ExitCode> {
    let started = engine.start_new_workflow(args.into()).await?;
    output(&started, json);
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct ResetOutput {
    reset: bool,
    #[serde(flatten)]
    outcome: Option<ResetOutcome>,
}

impl CommandOutput for ResetOutput {
    fn to_human(&self) -> String {
        match &self.outcome {
            None => "Reset cancelled.".to_string(),
            Some(ResetOutcome {
                archived: Some(archive_id),
            }) => format!("Workflow archived as {archive_id}. Run `nftmigrate start` to begin again."),
            Some(ResetOutcome { archived: None }) => "No active workflow to reset.".to_string(),
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{prompt} [y/N] "))
        .context("Failed to write prompt")?;
    let answer = term.read_line().context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn reset(engine: &Engine, yes: bool, json: bool) -> Result<ExitCode> {
    if !yes {
        if let StatusReport::Active(summary) = engine.get_status().await {
            if json {
                anyhow::bail!("Refusing to reset without --yes in JSON mode");
            }
            let prompt = format!(
                "Archive workflow {} ({} phases complete) and clear it?",
                summary.workflow_id, summary.progress
            );
            if !confirm(&prompt)? {
                output(
                    &ResetOutput {
                        reset: false,
                        outcome: None,
                    },
                    json,
                );
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    let outcome = engine.reset_workflow().await?;
    output(
        &ResetOutput {
            reset: true,
            outcome: Some(outcome),
        },
        json,
    );
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct DecisionOutput<'a> {
    action: &'a str,
    decision: &'a str,
    comment: &'a str,
}

impl CommandOutput for DecisionOutput<'_> {
    fn to_human(&self) -> String {
        format!("Recorded decision '{}' for '{}'", self.decision, self.action)
    }
}

pub async fn decide(
    engine: &Engine,
    action: &str,
    decision: &str,
    comment: &str,
    json: bool,
) -> Result<ExitCode> {
    engine.log_user_decision(action, decision, comment).await?;
    output(
        &DecisionOutput {
            action,
            decision,
            comment,
        },
        json,
    );
    Ok(ExitCode::SUCCESS)
}
