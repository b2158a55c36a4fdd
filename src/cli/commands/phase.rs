//! Phase-executing commands: `continue`, `phase`, `jump` and `retry`.

use std::future::Future;
use std::process::ExitCode;

use anyhow::Result;
use console::style;

use super::Engine;
use crate::cli::output::{create_spinner, output, CommandOutput, ProgressBarExt};
use crate::cli::types::PhaseOptions;
use crate::domain::errors::DomainResult;
use crate::domain::models::Phase;
use crate::services::workflow_engine::PhaseOutcome;

impl CommandOutput for PhaseOutcome {
    fn to_human(&self) -> String {
        match self {
            Self::Completed {
                phase,
                result,
                next_action,
            } => format!(
                "{} {}: {} completed\n  {}\n\nNext: {next_action}",
                style("✓").green(),
                phase,
                phase.title(),
                result.headline()
            ),
            Self::Failed {
                phase,
                error,
                trace,
                can_retry,
            } => {
                let mut lines = vec![
                    format!("{} {}: {} failed", style("✗").red(), phase, phase.title()),
                    format!("  Error: {error}"),
                ];
                lines.extend(trace.iter().map(|cause| format!("    caused by: {cause}")));
                if *can_retry {
                    lines.push("\nFix the problem and run `nftmigrate retry`.".to_string());
                }
                lines.join("\n")
            }
            Self::AlreadyCompleted { current_phase } => format!(
                "All phases are complete (current phase {current_phase}). Run `nftmigrate report`."
            ),
        }
    }
}

/// Await `run` behind a spinner and print its outcome.
pub(crate) async fn run_with_spinner<F>(label: String, json: bool, run: F) -> Result<ExitCode>
where
    F: Future<Output = DomainResult<PhaseOutcome>>,
{
    let spinner = create_spinner(label, json);
    let outcome = match run.await {
        Ok(outcome) => outcome,
        Err(err) => {
            spinner.finish_and_clear();
            return Err(err.into());
        }
    };

    match &outcome {
        PhaseOutcome::Failed { phase, .. } => spinner.finish_error(format!("{phase} failed")),
        _ => spinner.finish_and_clear(),
    }
    output(&outcome, json);

    Ok(if outcome.is_success() || matches!(outcome, PhaseOutcome::AlreadyCompleted { .. }) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn label(phase: Option<Phase>) -> String {
    phase.map_or_else(
        || "Running phase...".to_string(),
        |p| format!("{p}: {}...", p.title()),
    )
}

pub async fn continue_next(engine: &Engine, options: &PhaseOptions, json: bool) -> Result<ExitCode> {
    let next = match engine.get_status().await {
        crate::services::StatusReport::Active(summary) => {
            Phase::from_number(summary.current_phase + 1)
        }
        crate::services::StatusReport::NoActiveWorkflow => None,
    };
    run_with_spinner(label(next), json, engine.continue_to_next_phase(options.to_params())).await
}

pub async fn run(engine: &Engine, number: u8, options: &PhaseOptions, json: bool) -> Result<ExitCode> {
    run_with_spinner(
        label(Phase::from_number(number)),
        json,
        engine.execute_phase(number, options.to_params()),
    )
    .await
}

pub async fn jump(engine: &Engine, number: u8, options: &PhaseOptions, json: bool) -> Result<ExitCode> {
    run_with_spinner(
        label(Phase::from_number(number)),
        json,
        engine.jump_to_phase(number, options.to_params()),
    )
    .await
}

pub async fn retry(engine: &Engine, options: &PhaseOptions, json: bool) -> Result<ExitCode> {
    run_with_spinner(label(None), json, engine.retry_current_phase(options.to_params())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentMetadata, AgentRegistration, NetworkConfig, PhaseOutput};
    use crate::services::NextAction;

    #[test]
    fn test_failed_outcome_lists_causes() {
        let outcome = PhaseOutcome::Failed {
            phase: Phase::MigrateToStorage,
            error: "Batch migration failed: Network timeout: gateway".into(),
            trace: vec!["Network timeout: gateway".into()],
            can_retry: true,
        };
        let text = outcome.to_human();
        assert!(text.contains("Phase 4: Migrate IPFS to Filecoin failed"));
        assert!(text.contains("caused by: Network timeout: gateway"));
        assert!(text.contains("nftmigrate retry"));
    }

    #[test]
    fn test_completed_outcome_json_shape() {
        let outcome = PhaseOutcome::Completed {
            phase: Phase::RegisterAgent,
            result: PhaseOutput::RegisterAgent(AgentRegistration {
                agent_id: 42,
                agent_address: "0xA".into(),
                metadata_uri: "ipfs://m".into(),
                metadata: AgentMetadata::default(),
                tx_hash: "0xT1".into(),
                network: NetworkConfig {
                    name: "Sepolia Testnet".into(),
                    chain_id: 11_155_111,
                    rpc_url: "https://rpc".into(),
                },
                registered_at: chrono::Utc::now(),
            }),
            next_action: NextAction::ContinueTo(Phase::ScanNft),
        };
        let json = outcome.to_json();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["phase"], 1);
        assert_eq!(json["result"]["data"]["agent_id"], 42);
        assert!(outcome.to_human().contains("Next: Continue to Phase 2"));
    }
}
