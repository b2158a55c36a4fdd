//! Read-only commands: `status`, `results`, `report`, `history`, `phases`.

use std::process::ExitCode;

use anyhow::Result;
use console::style;
use serde::Serialize;

use super::Engine;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{FinalReport, Phase, TOTAL_PHASES};
use crate::domain::ports::{ArchivedWorkflow, WorkflowSnapshot};
use crate::services::workflow_engine::{PhaseInfo, PhaseResultView, StatusReport};

impl CommandOutput for StatusReport {
    fn to_human(&self) -> String {
        match self {
            Self::NoActiveWorkflow => {
                "No active workflow. Run `nftmigrate start` to begin.".to_string()
            }
            Self::Active(summary) => {
                let mut lines = vec![
                    format!("Workflow {}", style(&summary.workflow_id).bold()),
                    format!("  Status:   {}", summary.status),
                    format!("  Progress: {} phases", summary.progress),
                    format!("  Updated:  {}", summary.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
                ];
                if summary.error_count > 0 {
                    lines.push(format!("  Errors:   {}", summary.error_count));
                }
                if let Some(phase) = summary.orphaned_phase {
                    lines.push(format!(
                        "  {} {phase} was interrupted; run `nftmigrate retry`",
                        style("!").yellow()
                    ));
                }
                lines.push(TableFormatter::new().format_phases(&summary.phases));
                lines.push(format!("Next: {}", summary.next_action));
                lines.join("\n")
            }
        }
    }
}

pub async fn status(engine: &Engine, json: bool) -> Result<ExitCode> {
    output(&engine.get_status().await, json);
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct ResultsOutput(Vec<PhaseResultView>);

impl CommandOutput for ResultsOutput {
    fn to_human(&self) -> String {
        let single = self.0.len() == 1;
        self.0
            .iter()
            .map(|view| match &view.result {
                Some(result) if single => format!(
                    "{}: {} ({})\n{}",
                    view.phase,
                    view.phase.title(),
                    view.status,
                    serde_json::to_string_pretty(result).unwrap_or_default()
                ),
                Some(result) => format!("{} {}: {}", style("✓").green(), view.phase, result.headline()),
                None => format!("  {}: no result ({})", view.phase, view.status),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn results(engine: &Engine, number: Option<u8>, json: bool) -> Result<ExitCode> {
    let views = match number {
        Some(n) => vec![engine.phase_result(n).await?],
        None => {
            let mut views = Vec::with_capacity(usize::from(TOTAL_PHASES));
            for phase in Phase::ALL {
                views.push(engine.phase_result(phase.number()).await?);
            }
            views
        }
    };
    output(&ResultsOutput(views), json);
    Ok(ExitCode::SUCCESS)
}

impl CommandOutput for FinalReport {
    fn to_human(&self) -> String {
        let m = &self.migration;
        let lines = [
            style(&self.title).bold().to_string(),
            format!("Workflow {} completed {}", self.workflow_id, self.completed_at.format("%Y-%m-%d %H:%M:%S UTC")),
            String::new(),
            style("Agent").underlined().to_string(),
            format!("  ID:            {}", self.agent.agent_id),
            format!("  Address:       {}", self.agent.address),
            format!("  Metadata:      {}", self.agent.metadata_uri),
            format!("  Registration:  {}", self.agent.registration_tx),
            format!("  Active:        {}", self.agent.is_active),
            String::new(),
            style("NFT scan").underlined().to_string(),
            format!(
                "  Contract:      {} ({})",
                self.nft_scan.contract.address,
                self.nft_scan.contract.name.as_deref().unwrap_or("unknown")
            ),
            format!("  Tokens:        {}", self.nft_scan.scanned_tokens),
            format!("  Unique CIDs:   {}", self.nft_scan.unique_cids),
            String::new(),
            style("Migration").underlined().to_string(),
            format!(
                "  Migrated:      {}/{} ({:.1}%), {} failed",
                m.successful, m.total, m.success_rate, m.failed
            ),
            String::new(),
            style("Validation").underlined().to_string(),
            format!("  Request:       {}", self.validation.request_hash),
            format!("  Validator:     {}", self.validation.validator),
            format!("  Status:        {}", self.validation.status),
            format!("  Approved:      {}", self.validation.approved),
            String::new(),
            format!(
                "Networks: NFT on {}, registries on {}, storage on {}",
                self.networks.nft, self.networks.validation, self.networks.filecoin
            ),
        ];
        lines.join("\n")
    }
}

pub async fn report(engine: &Engine, json: bool) -> Result<ExitCode> {
    output(&engine.full_report().await?, json);
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
struct HistoryOutput {
    snapshots: Vec<WorkflowSnapshot>,
    archives: Vec<ArchivedWorkflow>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut sections = Vec::new();
        if self.snapshots.is_empty() {
            sections.push("No active workflow history.".to_string());
        } else {
            sections.push(format!("Snapshots of {}:", self.snapshots[0].workflow_id));
            sections.push(formatter.format_history(&self.snapshots));
        }
        if !self.archives.is_empty() {
            sections.push("Archived workflows:".to_string());
            sections.push(formatter.format_archives(&self.archives));
        }
        sections.join("\n")
    }
}

pub async fn history(engine: &Engine, json: bool) -> Result<ExitCode> {
    let snapshots = match engine.history().await {
        Ok(snapshots) => snapshots,
        Err(crate::domain::errors::DomainError::NoActiveWorkflow) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let archives = engine.archives().await?;
    output(&HistoryOutput { snapshots, archives }, json);
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct PhasesOutput(Vec<PhaseInfo>);

impl CommandOutput for PhasesOutput {
    fn to_human(&self) -> String {
        TableFormatter::new().format_phase_info(&self.0)
    }
}

pub async fn phases(engine: &Engine, json: bool) -> Result<ExitCode> {
    output(&PhasesOutput(engine.list_phases().await), json);
    Ok(ExitCode::SUCCESS)
}
