//! Typed phase results.
//!
//! Each phase produces exactly one variant of [`PhaseOutput`]. Later phases
//! read earlier results through [`PriorResults`], a typed partial record built
//! from the completed phases of the workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::NetworkConfig;
use super::workflow::{Phase, PhaseStatus, Workflow};

// ============================================================================
// Shared value types
// ============================================================================

/// Inclusive token id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRange {
    pub start: u64,
    pub end: u64,
}

impl TokenRange {
    /// Number of token ids in the range, or `None` when the count does not
    /// fit in a `u64` (the full `0..=u64::MAX` range).
    pub const fn len(&self) -> Option<u64> {
        if self.is_empty() {
            return Some(0);
        }
        (self.end - self.start).checked_add(1)
    }

    pub const fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Metadata document published for an agent before registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(rename = "type", default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default = "default_agent_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_agent_type() -> String {
    "AI Agent".to_string()
}

fn default_agent_version() -> String {
    "1.0.0".to_string()
}

impl Default for AgentMetadata {
    fn default() -> Self {
        Self {
            name: "NFT Migration Agent".to_string(),
            description: "Migrates NFT content from IPFS to Filecoin-backed storage and \
                          proves the result through ERC-8004 validation"
                .to_string(),
            capabilities: vec![
                "nft-scanning".to_string(),
                "ipfs-migration".to_string(),
                "filecoin-storage".to_string(),
                "erc8004-validation".to_string(),
            ],
            agent_type: default_agent_type(),
            version: default_agent_version(),
            owner: None,
            created_at: None,
        }
    }
}

/// On-chain facts about the scanned NFT contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<u64>,
}

/// Aggregate counts of a token scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: u64,
    pub with_ipfs: u64,
    pub failed: u64,
}

/// Scan result for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenScan {
    pub token_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub cids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of migrating one CID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationItem {
    pub source_cid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Aggregate counts of a batch migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    /// Percentage 0..=100; 0.0 for an empty batch.
    pub success_rate: f64,
}

impl MigrationSummary {
    pub fn from_items(items: &[MigrationItem]) -> Self {
        let total = items.len() as u64;
        let successful = items.iter().filter(|i| i.success).count() as u64;
        Self::from_counts(total, successful)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(total: u64, successful: u64) -> Self {
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };
        Self {
            total,
            successful,
            failed: total.saturating_sub(successful),
            success_rate,
        }
    }
}

// ============================================================================
// Per-phase results
// ============================================================================

/// Phase 1 result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: u64,
    pub agent_address: String,
    pub metadata_uri: String,
    pub metadata: AgentMetadata,
    pub tx_hash: String,
    pub network: NetworkConfig,
    pub registered_at: DateTime<Utc>,
}

/// Phase 2 result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftScanReport {
    pub contract_info: ContractInfo,
    pub scan_summary: ScanSummary,
    pub unique_cids: Vec<String>,
    pub token_details: Vec<TokenScan>,
    pub scanned_range: TokenRange,
    pub scanned_at: DateTime<Utc>,
}

/// NFT collection a migration task targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTarget {
    pub contract: String,
    pub token_range: TokenRange,
}

/// Task document referenced by the validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub task: String,
    pub nft: NftTarget,
    pub ipfs_cids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub requester: String,
}

/// Phase 3 result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequestRecord {
    pub request_hash: String,
    pub task_uri: String,
    pub task_metadata: TaskMetadata,
    pub validator_address: String,
    pub agent_id: u64,
    pub tx_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Phase 4 result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub summary: MigrationSummary,
    pub results: Vec<MigrationItem>,
    pub migrated_at: DateTime<Utc>,
}

/// Proof document published after migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofMetadata {
    pub task_uri: String,
    pub results: Vec<MigrationItem>,
    pub summary: MigrationSummary,
    pub created_at: DateTime<Utc>,
}

/// Phase 5 result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub proof_metadata: ProofMetadata,
    pub proof_uri: String,
    pub migration_summary: MigrationSummary,
    pub generated_at: DateTime<Utc>,
}

/// Who made the phase 6 approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Operator,
    Policy,
}

/// Phase 6 result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponseRecord {
    pub approved: bool,
    pub decided_by: DecisionSource,
    pub request_hash: String,
    pub proof_uri: String,
    pub validator_address: String,
    pub tx_hash: String,
    pub submitted_at: DateTime<Utc>,
}

/// Agent section of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSection {
    pub agent_id: u64,
    pub address: String,
    pub metadata_uri: String,
    pub registration_tx: String,
    /// Live registry state at report time.
    pub is_active: bool,
}

/// NFT scan section of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftScanSection {
    pub contract: ContractInfo,
    pub scanned_tokens: u64,
    pub unique_cids: usize,
}

/// Validation section of the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSection {
    pub request_hash: String,
    pub validator: String,
    /// Live registry status at report time.
    pub status: String,
    pub is_valid: bool,
    pub approved: bool,
    pub request_tx: String,
    pub response_tx: String,
}

/// Networks the run touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkNames {
    pub nft: String,
    pub validation: String,
    pub filecoin: String,
}

/// Phase 7 result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub title: String,
    pub workflow_id: String,
    pub completed_at: DateTime<Utc>,
    pub agent: AgentSection,
    pub nft_scan: NftScanSection,
    pub validation: ValidationSection,
    pub migration: MigrationSummary,
    pub networks: NetworkNames,
}

// ============================================================================
// PhaseOutput
// ============================================================================

/// The result of one successful phase, tagged by phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "data", rename_all = "snake_case")]
pub enum PhaseOutput {
    RegisterAgent(AgentRegistration),
    ScanNft(NftScanReport),
    CreateValidationRequest(ValidationRequestRecord),
    MigrateToStorage(MigrationReport),
    GenerateProof(ProofRecord),
    SubmitValidation(ValidationResponseRecord),
    FinalReport(Box<FinalReport>),
}

impl PhaseOutput {
    /// The phase that produced this output.
    pub const fn phase(&self) -> Phase {
        match self {
            Self::RegisterAgent(_) => Phase::RegisterAgent,
            Self::ScanNft(_) => Phase::ScanNft,
            Self::CreateValidationRequest(_) => Phase::CreateValidationRequest,
            Self::MigrateToStorage(_) => Phase::MigrateToStorage,
            Self::GenerateProof(_) => Phase::GenerateProof,
            Self::SubmitValidation(_) => Phase::SubmitValidation,
            Self::FinalReport(_) => Phase::FinalReport,
        }
    }

    /// One-line summary for status views.
    pub fn headline(&self) -> String {
        match self {
            Self::RegisterAgent(r) => format!("Agent #{} registered (tx {})", r.agent_id, r.tx_hash),
            Self::ScanNft(r) => format!(
                "Scanned {} tokens, {} unique CIDs",
                r.scan_summary.total,
                r.unique_cids.len()
            ),
            Self::CreateValidationRequest(r) => format!("Validation request {}", r.request_hash),
            Self::MigrateToStorage(r) => format!(
                "Migrated {}/{} CIDs ({:.1}%)",
                r.summary.successful, r.summary.total, r.summary.success_rate
            ),
            Self::GenerateProof(r) => format!("Proof published at {}", r.proof_uri),
            Self::SubmitValidation(r) => format!(
                "Validation {} (tx {})",
                if r.approved { "approved" } else { "rejected" },
                r.tx_hash
            ),
            Self::FinalReport(r) => format!("Report for {}", r.workflow_id),
        }
    }
}

// ============================================================================
// PriorResults
// ============================================================================

/// Results of the completed phases preceding the one being executed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorResults {
    pub agent: Option<AgentRegistration>,
    pub scan: Option<NftScanReport>,
    pub validation_request: Option<ValidationRequestRecord>,
    pub migration: Option<MigrationReport>,
    pub proof: Option<ProofRecord>,
    pub validation_response: Option<ValidationResponseRecord>,
}

impl PriorResults {
    /// Collect results of completed phases numbered strictly below `before`.
    pub fn collect(workflow: &Workflow, before: Phase) -> Self {
        let mut prior = Self::default();
        for (phase, record) in &workflow.phases {
            if *phase >= before || record.status != PhaseStatus::Completed {
                continue;
            }
            if let Some(output) = &record.result {
                prior.insert(output.clone());
            }
        }
        prior
    }

    fn insert(&mut self, output: PhaseOutput) {
        match output {
            PhaseOutput::RegisterAgent(r) => self.agent = Some(r),
            PhaseOutput::ScanNft(r) => self.scan = Some(r),
            PhaseOutput::CreateValidationRequest(r) => self.validation_request = Some(r),
            PhaseOutput::MigrateToStorage(r) => self.migration = Some(r),
            PhaseOutput::GenerateProof(r) => self.proof = Some(r),
            PhaseOutput::SubmitValidation(r) => self.validation_response = Some(r),
            PhaseOutput::FinalReport(_) => {}
        }
    }

    /// Phases with a result present, in order.
    pub fn phases(&self) -> Vec<Phase> {
        [
            (Phase::RegisterAgent, self.agent.is_some()),
            (Phase::ScanNft, self.scan.is_some()),
            (Phase::CreateValidationRequest, self.validation_request.is_some()),
            (Phase::MigrateToStorage, self.migration.is_some()),
            (Phase::GenerateProof, self.proof.is_some()),
            (Phase::SubmitValidation, self.validation_response.is_some()),
        ]
        .into_iter()
        .filter_map(|(phase, present)| present.then_some(phase))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::models::workflow::{WorkflowConfig, PhaseFailure};

    fn migration(successes: &[bool]) -> PhaseOutput {
        let results: Vec<MigrationItem> = successes
            .iter()
            .enumerate()
            .map(|(i, ok)| MigrationItem {
                source_cid: format!("bafy{i}"),
                destination_id: ok.then(|| format!("piece{i}")),
                success: *ok,
                error: (!ok).then(|| "upload failed".to_string()),
                size_bytes: None,
            })
            .collect();
        PhaseOutput::MigrateToStorage(MigrationReport {
            summary: MigrationSummary::from_items(&results),
            results,
            migrated_at: Utc::now(),
        })
    }

    #[test]
    fn test_summary_rates() {
        let empty = MigrationSummary::from_items(&[]);
        assert_eq!(empty.total, 0);
        assert!(empty.success_rate.abs() < f64::EPSILON);

        let half = MigrationSummary::from_counts(4, 2);
        assert_eq!(half.failed, 2);
        assert!((half.success_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_token_range_len() {
        assert_eq!(TokenRange { start: 0, end: 4 }.len(), Some(5));
        assert!(!TokenRange { start: 3, end: 3 }.is_empty());
        assert_eq!(TokenRange { start: 3, end: 3 }.len(), Some(1));
    }

    #[test]
    fn test_token_range_len_at_extremes() {
        let inverted = TokenRange { start: 9, end: 2 };
        assert!(inverted.is_empty());
        assert_eq!(inverted.len(), Some(0));

        let top = TokenRange { start: u64::MAX, end: u64::MAX };
        assert_eq!(top.len(), Some(1));

        assert_eq!(TokenRange { start: 1, end: u64::MAX }.len(), Some(u64::MAX));
        assert_eq!(TokenRange { start: 0, end: u64::MAX }.len(), None);
    }

    #[test]
    fn test_output_is_tagged_by_phase() {
        let output = migration(&[true]);
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["phase"], "migrate_to_storage");
        assert_eq!(value["data"]["summary"]["successful"], 1);
        assert_eq!(output.phase(), Phase::MigrateToStorage);
        assert_eq!(output.headline(), "Migrated 1/1 CIDs (100.0%)");
    }

    #[test]
    fn test_agent_metadata_type_field_name() {
        let value = serde_json::to_value(AgentMetadata::default()).unwrap();
        assert_eq!(value["type"], "AI Agent");
        let parsed: AgentMetadata =
            serde_json::from_value(serde_json::json!({"name": "a", "description": "b"})).unwrap();
        assert_eq!(parsed.version, "1.0.0");
        assert!(parsed.capabilities.is_empty());
    }

    #[test]
    fn test_prior_results_only_include_completed_earlier_phases() {
        let mut wf = Workflow::new(WorkflowConfig {
            nft_contract: "0x0000000000000000000000000000000000000001".to_string(),
            start_token_id: 0,
            end_token_id: 1,
            validator_address: None,
            extra: BTreeMap::new(),
        });
        let now = Utc::now();
        wf.begin_phase(Phase::MigrateToStorage, now);
        wf.finish_phase(Phase::MigrateToStorage, migration(&[true, false]), now);
        wf.begin_phase(Phase::GenerateProof, now);
        wf.fail_phase(Phase::GenerateProof, PhaseFailure::new("x"), now);

        let before_four = PriorResults::collect(&wf, Phase::MigrateToStorage);
        assert!(before_four.migration.is_none());
        assert!(before_four.phases().is_empty());

        let before_seven = PriorResults::collect(&wf, Phase::FinalReport);
        assert_eq!(before_seven.phases(), vec![Phase::MigrateToStorage]);
        assert!(before_seven.proof.is_none());
    }
}
