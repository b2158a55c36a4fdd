//! Workflow state models.
//!
//! A `Workflow` is the single persisted record of one end-to-end migration
//! run. It owns one `PhaseRecord` per pipeline step plus two append-only logs:
//! operator decisions and phase failures.
//!
//! All mutation helpers here are pure; loading and saving is the job of
//! `WorkflowStateService`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::phase_output::{AgentMetadata, PhaseOutput};
use crate::domain::errors::DomainError;

/// Total number of phases in the pipeline.
pub const TOTAL_PHASES: u8 = 7;

// ============================================================================
// Phase
// ============================================================================

/// One of the seven ordered pipeline steps.
///
/// Serialized as its phase number so persisted records read `"1"` .. `"7"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    RegisterAgent = 1,
    ScanNft = 2,
    CreateValidationRequest = 3,
    MigrateToStorage = 4,
    GenerateProof = 5,
    SubmitValidation = 6,
    FinalReport = 7,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 7] = [
        Phase::RegisterAgent,
        Phase::ScanNft,
        Phase::CreateValidationRequest,
        Phase::MigrateToStorage,
        Phase::GenerateProof,
        Phase::SubmitValidation,
        Phase::FinalReport,
    ];

    /// Phase number, 1-based.
    pub const fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1..=7 => Some(Self::ALL[usize::from(n - 1)]),
            _ => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number().saturating_sub(1))
    }

    /// Short human-readable title.
    pub const fn title(self) -> &'static str {
        match self {
            Self::RegisterAgent => "Register Agent",
            Self::ScanNft => "Scan NFT Project",
            Self::CreateValidationRequest => "Create Validation Request",
            Self::MigrateToStorage => "Migrate IPFS to Filecoin",
            Self::GenerateProof => "Generate Proof",
            Self::SubmitValidation => "Submit Validation Response",
            Self::FinalReport => "Generate Final Report",
        }
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.number()
    }
}

impl TryFrom<u8> for Phase {
    type Error = DomainError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n).ok_or(DomainError::InvalidPhase(n))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}", self.number())
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Status of a single phase within a workflow.
///
/// ```text
/// Pending → InProgress → Completed
///                      ↘ Failed → InProgress (retry)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl PhaseStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall workflow status, derived from the phase records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Initialized,
    InProgress,
    WaitingForInput,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::InProgress => "in_progress",
            Self::WaitingForInput => "waiting_for_input",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Error captured when a phase attempt fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFailure {
    pub message: String,
    /// Causes below the top-level message, outermost first.
    #[serde(default)]
    pub trace: Vec<String>,
}

impl PhaseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: Vec::new(),
        }
    }

    /// Capture an error together with its `source()` chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let trace = std::iter::successors(err.source(), |e| e.source())
            .map(ToString::to_string)
            .collect();
        Self {
            message: err.to_string(),
            trace,
        }
    }
}

/// Persisted state of one phase within a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PhaseOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PhaseFailure>,
    /// How many times the phase has been started.
    #[serde(default)]
    pub attempts: u32,
}

/// One operator decision in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAction {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub decision: String,
    #[serde(default)]
    pub comment: String,
}

/// One phase failure in the error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub phase: Phase,
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

// ============================================================================
// Configuration and parameters
// ============================================================================

/// Parameters fixed at workflow creation and read by the phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub nft_contract: String,
    pub start_token_id: u64,
    pub end_token_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_address: Option<String>,
    /// Free-form settings carried along for collaborators.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl WorkflowConfig {
    /// Effective configuration for one phase call: per-call parameters win.
    pub fn merged_with(&self, params: &PhaseParams) -> Self {
        let mut merged = self.clone();
        if let Some(contract) = &params.nft_contract {
            merged.nft_contract.clone_from(contract);
        }
        if let Some(start) = params.start_token_id {
            merged.start_token_id = start;
        }
        if let Some(end) = params.end_token_id {
            merged.end_token_id = end;
        }
        if params.validator_address.is_some() {
            merged.validator_address.clone_from(&params.validator_address);
        }
        for (key, value) in &params.extra {
            merged.extra.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Creation request for a new workflow; unset fields use configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub nft_contract: Option<String>,
    pub start_token_id: Option<u64>,
    pub end_token_id: Option<u64>,
    pub validator_address: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NewWorkflow {
    pub fn into_config(self, defaults: &WorkflowConfig) -> WorkflowConfig {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra);
        WorkflowConfig {
            nft_contract: self
                .nft_contract
                .unwrap_or_else(|| defaults.nft_contract.clone()),
            start_token_id: self.start_token_id.unwrap_or(defaults.start_token_id),
            end_token_id: self.end_token_id.unwrap_or(defaults.end_token_id),
            validator_address: self
                .validator_address
                .or_else(|| defaults.validator_address.clone()),
            extra,
        }
    }
}

/// Explicit per-call parameters for a phase execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft_contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_token_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_token_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_address: Option<String>,
    /// Operator override of the phase 6 approval decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    /// Replaces the generated agent metadata in phase 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_metadata: Option<AgentMetadata>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// Workflow
// ============================================================================

/// Generate a fresh workflow identifier: `workflow-<millis>-<random>`.
pub fn generate_workflow_id(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("workflow-{}-{}", now.timestamp_millis(), &random[..9])
}

/// The persisted state of one migration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Highest completed phase number, 0 when nothing has completed.
    pub current_phase: u8,
    pub status: WorkflowStatus,
    pub config: WorkflowConfig,
    pub phases: BTreeMap<Phase, PhaseRecord>,
    #[serde(default)]
    pub user_actions: Vec<UserAction>,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

impl Workflow {
    /// Create a workflow with all seven phases pending.
    pub fn new(config: WorkflowConfig) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: generate_workflow_id(now),
            created_at: now,
            updated_at: now,
            current_phase: 0,
            status: WorkflowStatus::Initialized,
            config,
            phases: Phase::ALL
                .iter()
                .map(|phase| (*phase, PhaseRecord::default()))
                .collect(),
            user_actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record(&self, phase: Phase) -> Option<&PhaseRecord> {
        self.phases.get(&phase)
    }

    fn record_mut(&mut self, phase: Phase) -> &mut PhaseRecord {
        self.phases.entry(phase).or_default()
    }

    pub fn phase_status(&self, phase: Phase) -> PhaseStatus {
        self.record(phase).map_or(PhaseStatus::Pending, |r| r.status)
    }

    pub fn completed_count(&self) -> usize {
        self.phases
            .values()
            .filter(|r| r.status == PhaseStatus::Completed)
            .count()
    }

    /// `"completed/total"`, e.g. `"3/7"`.
    pub fn progress(&self) -> String {
        format!("{}/{}", self.completed_count(), TOTAL_PHASES)
    }

    pub fn is_complete(&self) -> bool {
        self.phase_status(Phase::FinalReport) == PhaseStatus::Completed
    }

    /// The next phase to run, if any.
    pub fn frontier(&self) -> Option<Phase> {
        Phase::from_number(self.current_phase + 1)
    }

    /// A phase left `in_progress`, i.e. interrupted mid-execution.
    pub fn orphaned_phase(&self) -> Option<Phase> {
        self.phases
            .iter()
            .find(|(_, r)| r.status == PhaseStatus::InProgress)
            .map(|(phase, _)| *phase)
    }

    /// Re-derive `status` from the phase records.
    pub fn refresh_status(&mut self) {
        let statuses: Vec<PhaseStatus> = self.phases.values().map(|r| r.status).collect();
        self.status = if self.is_complete() {
            WorkflowStatus::Completed
        } else if statuses.contains(&PhaseStatus::InProgress) {
            WorkflowStatus::InProgress
        } else if statuses.contains(&PhaseStatus::Failed) {
            WorkflowStatus::Failed
        } else if statuses.iter().all(|s| *s == PhaseStatus::Pending) {
            WorkflowStatus::Initialized
        } else {
            WorkflowStatus::WaitingForInput
        };
    }

    pub fn begin_phase(&mut self, phase: Phase, now: DateTime<Utc>) {
        let record = self.record_mut(phase);
        record.status = PhaseStatus::InProgress;
        record.started_at = Some(now);
        record.completed_at = None;
        record.failed_at = None;
        record.result = None;
        record.error = None;
        record.attempts += 1;
        self.refresh_status();
    }

    pub fn finish_phase(&mut self, phase: Phase, output: PhaseOutput, now: DateTime<Utc>) {
        let record = self.record_mut(phase);
        record.status = PhaseStatus::Completed;
        record.completed_at = Some(now);
        record.result = Some(output);
        record.error = None;
        self.current_phase = self.current_phase.max(phase.number());
        self.refresh_status();
    }

    pub fn fail_phase(&mut self, phase: Phase, failure: PhaseFailure, now: DateTime<Utc>) {
        self.errors.push(ErrorEntry {
            phase,
            timestamp: now,
            error: failure.message.clone(),
        });
        let record = self.record_mut(phase);
        record.status = PhaseStatus::Failed;
        record.failed_at = Some(now);
        record.result = None;
        record.error = Some(failure);
        self.refresh_status();
    }

    pub fn push_user_action(
        &mut self,
        action: impl Into<String>,
        decision: impl Into<String>,
        comment: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.user_actions.push(UserAction {
            timestamp: now,
            action: action.into(),
            decision: decision.into(),
            comment: comment.into(),
        });
    }

    /// Suggested next operator action, derived from `current_phase`.
    pub fn next_action(&self) -> String {
        if self.current_phase >= TOTAL_PHASES {
            return "Workflow completed".to_string();
        }
        let Some(frontier) = self.frontier() else {
            return "Workflow completed".to_string();
        };
        if self.current_phase == 0 {
            return match self.phase_status(frontier) {
                PhaseStatus::Failed => format!("Retry Phase 1: {}", frontier.title()),
                PhaseStatus::InProgress => format!("Resume Phase 1: {} (interrupted)", frontier.title()),
                _ => format!("Start Phase 1: {}", frontier.title()),
            };
        }
        match self.phase_status(frontier) {
            PhaseStatus::Failed => format!("Retry Phase {}", frontier.number()),
            PhaseStatus::InProgress => format!("Resume Phase {} (interrupted)", frontier.number()),
            _ => format!("Continue to Phase {}", frontier.number()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            nft_contract: "0xabc0000000000000000000000000000000000001".to_string(),
            start_token_id: 0,
            end_token_id: 4,
            validator_address: None,
            extra: BTreeMap::new(),
        }
    }

    fn dummy_output() -> PhaseOutput {
        serde_json::from_value(serde_json::json!({
            "phase": "migrate_to_storage",
            "data": {
                "summary": {"total": 0, "successful": 0, "failed": 0, "success_rate": 0.0},
                "results": [],
                "migrated_at": "2026-01-01T00:00:00Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_phase_numbering() {
        assert_eq!(Phase::RegisterAgent.number(), 1);
        assert_eq!(Phase::FinalReport.number(), 7);
        assert_eq!(Phase::from_number(3), Some(Phase::CreateValidationRequest));
        assert_eq!(Phase::from_number(0), None);
        assert_eq!(Phase::from_number(8), None);
        assert_eq!(Phase::FinalReport.next(), None);
        assert_eq!(Phase::RegisterAgent.previous(), None);
        assert_eq!(Phase::ScanNft.previous(), Some(Phase::RegisterAgent));
    }

    #[test]
    fn test_phase_serializes_as_number() {
        let json = serde_json::to_string(&Phase::GenerateProof).unwrap();
        assert_eq!(json, "5");
        let phase: Phase = serde_json::from_str("2").unwrap();
        assert_eq!(phase, Phase::ScanNft);
        assert!(serde_json::from_str::<Phase>("9").is_err());
    }

    #[test]
    fn test_new_workflow_has_seven_pending_phases() {
        let wf = Workflow::new(config());
        assert!(wf.workflow_id.starts_with("workflow-"));
        assert_eq!(wf.phases.len(), 7);
        assert!(wf.phases.values().all(|r| r.status == PhaseStatus::Pending));
        assert_eq!(wf.current_phase, 0);
        assert_eq!(wf.status, WorkflowStatus::Initialized);
        assert_eq!(wf.progress(), "0/7");
        assert_eq!(wf.next_action(), "Start Phase 1: Register Agent");
    }

    #[test]
    fn test_workflow_ids_are_unique() {
        let now = Utc::now();
        assert_ne!(generate_workflow_id(now), generate_workflow_id(now));
    }

    #[test]
    fn test_workflow_json_roundtrip_uses_numeric_phase_keys() {
        let wf = Workflow::new(config());
        let value = serde_json::to_value(&wf).unwrap();
        assert!(value["phases"].get("1").is_some());
        assert!(value["phases"].get("7").is_some());
        let back: Workflow = serde_json::from_value(value).unwrap();
        assert_eq!(back, wf);
    }

    #[test]
    fn test_status_follows_phase_transitions() {
        let mut wf = Workflow::new(config());
        let now = Utc::now();

        wf.begin_phase(Phase::RegisterAgent, now);
        assert_eq!(wf.status, WorkflowStatus::InProgress);
        assert_eq!(wf.orphaned_phase(), Some(Phase::RegisterAgent));

        wf.fail_phase(Phase::RegisterAgent, PhaseFailure::new("boom"), now);
        assert_eq!(wf.status, WorkflowStatus::Failed);
        assert_eq!(wf.errors.len(), 1);
        assert_eq!(wf.current_phase, 0);
        assert_eq!(wf.next_action(), "Retry Phase 1: Register Agent");

        wf.begin_phase(Phase::RegisterAgent, now);
        let record = wf.record(Phase::RegisterAgent).unwrap();
        assert!(record.error.is_none());
        assert_eq!(record.attempts, 2);

        wf.finish_phase(Phase::RegisterAgent, dummy_output(), now);
        assert_eq!(wf.status, WorkflowStatus::WaitingForInput);
        assert_eq!(wf.current_phase, 1);
        assert_eq!(wf.errors.len(), 1);
        assert_eq!(wf.next_action(), "Continue to Phase 2");
    }

    #[test]
    fn test_next_action_for_interrupted_and_failed_frontier() {
        let mut wf = Workflow::new(config());
        let now = Utc::now();
        wf.begin_phase(Phase::RegisterAgent, now);
        wf.finish_phase(Phase::RegisterAgent, dummy_output(), now);

        wf.begin_phase(Phase::ScanNft, now);
        assert_eq!(wf.next_action(), "Resume Phase 2 (interrupted)");

        wf.fail_phase(Phase::ScanNft, PhaseFailure::new("timeout"), now);
        assert_eq!(wf.next_action(), "Retry Phase 2");
    }

    #[test]
    fn test_completing_final_phase_completes_workflow() {
        let mut wf = Workflow::new(config());
        let now = Utc::now();
        for phase in Phase::ALL {
            wf.begin_phase(phase, now);
            wf.finish_phase(phase, dummy_output(), now);
        }
        assert_eq!(wf.current_phase, 7);
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert_eq!(wf.progress(), "7/7");
        assert_eq!(wf.next_action(), "Workflow completed");
        assert_eq!(wf.frontier(), None);
    }

    #[test]
    fn test_merged_config_prefers_params() {
        let base = config();
        let params = PhaseParams {
            start_token_id: Some(10),
            end_token_id: Some(20),
            validator_address: Some("0xvalidator".to_string()),
            ..Default::default()
        };
        let merged = base.merged_with(&params);
        assert_eq!(merged.nft_contract, base.nft_contract);
        assert_eq!(merged.start_token_id, 10);
        assert_eq!(merged.end_token_id, 20);
        assert_eq!(merged.validator_address.as_deref(), Some("0xvalidator"));
    }

    #[test]
    fn test_new_workflow_request_falls_back_to_defaults() {
        let defaults = WorkflowConfig {
            validator_address: Some("0xdefault".to_string()),
            ..config()
        };
        let request = NewWorkflow {
            end_token_id: Some(9),
            ..Default::default()
        };
        let cfg = request.into_config(&defaults);
        assert_eq!(cfg.nft_contract, defaults.nft_contract);
        assert_eq!(cfg.start_token_id, 0);
        assert_eq!(cfg.end_token_id, 9);
        assert_eq!(cfg.validator_address.as_deref(), Some("0xdefault"));
    }

    #[test]
    fn test_phase_failure_captures_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer failure")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out"));
        let failure = PhaseFailure::from_error(&err);
        assert_eq!(failure.message, "outer failure");
        assert_eq!(failure.trace, vec!["socket timed out".to_string()]);
    }
}
