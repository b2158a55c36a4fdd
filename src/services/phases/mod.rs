//! Phase handlers.
//!
//! A phase reads the effective configuration and the results of earlier
//! phases from a [`PhaseContext`], calls its collaborators and returns one
//! [`PhaseOutput`]. Handlers never touch persisted state; the engine records
//! whatever they return.

pub mod create_request;
pub mod final_report;
pub mod generate_proof;
pub mod migrate_storage;
pub mod register_agent;
pub mod scan_nft;
pub mod submit_validation;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::models::{
    AgentMetadata, AgentRegistration, ApprovalPolicy, Config, MigrationReport, NetworksConfig,
    NftScanReport, Phase, PhaseOutput, PhaseParams, PriorResults, ProofRecord,
    ValidationRequestRecord, ValidationResponseRecord, Workflow, WorkflowConfig,
};
use crate::domain::ports::{CollaboratorError, Collaborators};

pub use create_request::CreateValidationRequestPhase;
pub use final_report::FinalReportPhase;
pub use generate_proof::GenerateProofPhase;
pub use migrate_storage::MigrateToStoragePhase;
pub use register_agent::RegisterAgentPhase;
pub use scan_nft::ScanNftPhase;
pub use submit_validation::SubmitValidationPhase;

/// Why a phase attempt failed.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("{} result is missing; complete it first", .0)]
    MissingPrerequisite(Phase),

    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Wrap a collaborator failure with the operation that produced it.
pub(crate) fn collaborator(operation: &'static str) -> impl FnOnce(CollaboratorError) -> PhaseError {
    move |source| PhaseError::Collaborator { operation, source }
}

/// Outcome of checking per-call parameters before a phase runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParamValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ParamValidation {
    pub const fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// `0x` followed by 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Everything a phase may read.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub workflow: Workflow,
    /// Workflow config with this call's parameters applied.
    pub config: WorkflowConfig,
    pub params: PhaseParams,
    pub prior: PriorResults,
}

impl PhaseContext {
    /// Build the context for `phase` from a freshly persisted workflow.
    pub fn new(workflow: Workflow, phase: Phase, params: PhaseParams) -> Self {
        let config = workflow.config.merged_with(&params);
        let prior = PriorResults::collect(&workflow, phase);
        debug!(phase = phase.number(), prior = ?prior.phases(), "phase context assembled");
        Self {
            workflow,
            config,
            params,
            prior,
        }
    }

    pub fn agent(&self) -> Result<&AgentRegistration, PhaseError> {
        self.prior
            .agent
            .as_ref()
            .ok_or(PhaseError::MissingPrerequisite(Phase::RegisterAgent))
    }

    pub fn scan(&self) -> Result<&NftScanReport, PhaseError> {
        self.prior
            .scan
            .as_ref()
            .ok_or(PhaseError::MissingPrerequisite(Phase::ScanNft))
    }

    pub fn validation_request(&self) -> Result<&ValidationRequestRecord, PhaseError> {
        self.prior
            .validation_request
            .as_ref()
            .ok_or(PhaseError::MissingPrerequisite(Phase::CreateValidationRequest))
    }

    pub fn migration(&self) -> Result<&MigrationReport, PhaseError> {
        self.prior
            .migration
            .as_ref()
            .ok_or(PhaseError::MissingPrerequisite(Phase::MigrateToStorage))
    }

    pub fn proof(&self) -> Result<&ProofRecord, PhaseError> {
        self.prior
            .proof
            .as_ref()
            .ok_or(PhaseError::MissingPrerequisite(Phase::GenerateProof))
    }

    pub fn validation_response(&self) -> Result<&ValidationResponseRecord, PhaseError> {
        self.prior
            .validation_response
            .as_ref()
            .ok_or(PhaseError::MissingPrerequisite(Phase::SubmitValidation))
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    fn phase(&self) -> Phase;

    fn name(&self) -> &'static str {
        self.phase().title()
    }

    fn description(&self) -> &'static str;

    /// Check the effective configuration before anything is recorded.
    fn validate_params(&self, _config: &WorkflowConfig, _params: &PhaseParams) -> ParamValidation {
        ParamValidation::ok()
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError>;
}

/// Settings the standard phases read from process configuration.
#[derive(Debug, Clone)]
pub struct PhaseSettings {
    pub networks: NetworksConfig,
    pub approval: ApprovalPolicy,
    pub max_scan_span: u64,
    pub agent_profile: AgentMetadata,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PhaseSettings {
    fn from(config: &Config) -> Self {
        Self {
            networks: config.networks.clone(),
            approval: config.approval,
            max_scan_span: config.max_scan_span,
            agent_profile: AgentMetadata::default(),
        }
    }
}

/// Maps each phase to its handler.
#[derive(Clone, Default)]
pub struct PhaseRegistry {
    handlers: BTreeMap<Phase, Arc<dyn PhaseHandler>>,
}

impl PhaseRegistry {
    /// The seven production phases wired to `collaborators`.
    pub fn standard(collaborators: &Collaborators, settings: &PhaseSettings) -> Self {
        Self::default()
            .with_handler(Arc::new(RegisterAgentPhase::new(
                Arc::clone(&collaborators.agents),
                Arc::clone(&collaborators.uploader),
                settings.networks.validation.clone(),
                settings.agent_profile.clone(),
            )))
            .with_handler(Arc::new(ScanNftPhase::new(
                Arc::clone(&collaborators.scanner),
                settings.max_scan_span,
            )))
            .with_handler(Arc::new(CreateValidationRequestPhase::new(
                Arc::clone(&collaborators.validations),
                Arc::clone(&collaborators.uploader),
            )))
            .with_handler(Arc::new(MigrateToStoragePhase::new(Arc::clone(
                &collaborators.storage,
            ))))
            .with_handler(Arc::new(GenerateProofPhase::new(Arc::clone(
                &collaborators.uploader,
            ))))
            .with_handler(Arc::new(SubmitValidationPhase::new(
                Arc::clone(&collaborators.validations),
                settings.approval,
            )))
            .with_handler(Arc::new(FinalReportPhase::new(
                Arc::clone(&collaborators.agents),
                Arc::clone(&collaborators.validations),
                settings.networks.clone(),
            )))
    }

    /// Register `handler` for its phase, replacing any existing one.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn PhaseHandler>) -> Self {
        self.handlers.insert(handler.phase(), handler);
        self
    }

    pub fn get(&self, phase: Phase) -> Option<Arc<dyn PhaseHandler>> {
        self.handlers.get(&phase).cloned()
    }

    /// Registered handlers in phase order.
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn PhaseHandler>> {
        self.handlers.values()
    }
}

impl std::fmt::Debug for PhaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.keys().map(|p| p.number()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simulated::SimulatedCollaborators;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D"));
        assert!(!is_valid_address("0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13"));
        assert!(!is_valid_address("BC4CA0EdA7647A8aB7C2061c2E118A18a936f13D00"));
        assert!(!is_valid_address("0xZZ4CA0EdA7647A8aB7C2061c2E118A18a936f13D"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_standard_registry_covers_every_phase() {
        let sim = SimulatedCollaborators::new();
        let registry = PhaseRegistry::standard(&sim.collaborators(), &PhaseSettings::default());
        let phases: Vec<Phase> = registry.handlers().map(|h| h.phase()).collect();
        assert_eq!(phases, Phase::ALL.to_vec());
        for handler in registry.handlers() {
            assert_eq!(handler.name(), handler.phase().title());
            assert!(!handler.description().is_empty());
        }
    }

    #[test]
    fn test_collaborator_error_message_and_trace() {
        let err = collaborator("NFT scan")(CollaboratorError::Timeout("rpc after 30s".into()));
        assert_eq!(err.to_string(), "NFT scan failed: Network timeout: rpc after 30s");
        let failure = crate::domain::models::PhaseFailure::from_error(&err);
        assert_eq!(failure.trace, vec!["Network timeout: rpc after 30s".to_string()]);
    }

    #[test]
    fn test_missing_prerequisite_message() {
        let err = PhaseError::MissingPrerequisite(Phase::ScanNft);
        assert_eq!(err.to_string(), "Phase 2 result is missing; complete it first");
    }
}
