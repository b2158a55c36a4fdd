//! Workflow state operations on top of a `WorkflowStore`.
//!
//! Every mutation is load-mutate-save against the active slot, so the store
//! always holds the latest state and each save leaves a history snapshot.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Phase, PhaseFailure, PhaseOutput, PhaseStatus, Workflow, WorkflowConfig,
};
use crate::domain::ports::workflow_store::{
    ArchivedWorkflow, StoredPhaseOutput, WorkflowSnapshot, WorkflowStore,
};

/// Whether a phase may run right now, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseGate {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PhaseGate {
    const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// What a reset did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetOutcome {
    /// Archive id of the workflow that was active, if any.
    pub archived: Option<String>,
}

pub struct WorkflowStateService<S: WorkflowStore> {
    store: Arc<S>,
}

impl<S: WorkflowStore> WorkflowStateService<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create and persist a fresh workflow in the active slot.
    pub async fn create_workflow(&self, config: WorkflowConfig) -> DomainResult<Workflow> {
        let workflow = self.save(Workflow::new(config)).await?;
        info!(workflow_id = %workflow.workflow_id, "workflow created");
        Ok(workflow)
    }

    /// The active workflow. Unreadable state is reported as no workflow.
    pub async fn load_active(&self) -> Option<Workflow> {
        match self.store.load_active().await {
            Ok(workflow) => workflow,
            Err(err) => {
                warn!(error = %err, "active workflow unreadable, treating as absent");
                None
            }
        }
    }

    async fn require_active(&self) -> DomainResult<Workflow> {
        self.load_active().await.ok_or(DomainError::NoActiveWorkflow)
    }

    /// Stamp `updated_at`, re-derive status and persist.
    pub async fn save(&self, mut workflow: Workflow) -> DomainResult<Workflow> {
        workflow.updated_at = Utc::now();
        workflow.refresh_status();
        self.store.save(&workflow).await?;
        Ok(workflow)
    }

    pub async fn start_phase(&self, phase: Phase) -> DomainResult<Workflow> {
        let mut workflow = self.require_active().await?;
        workflow.begin_phase(phase, Utc::now());
        let workflow = self.save(workflow).await?;
        info!(workflow_id = %workflow.workflow_id, phase = phase.number(), "phase started");
        Ok(workflow)
    }

    pub async fn complete_phase(&self, phase: Phase, output: PhaseOutput) -> DomainResult<Workflow> {
        let mut workflow = self.require_active().await?;
        workflow.finish_phase(phase, output.clone(), Utc::now());
        let workflow = self.save(workflow).await?;

        if let Err(err) = self
            .store
            .save_phase_output(&workflow.workflow_id, phase, &output)
            .await
        {
            warn!(phase = phase.number(), error = %err, "failed to write phase output record");
        }

        info!(
            workflow_id = %workflow.workflow_id,
            phase = phase.number(),
            current_phase = workflow.current_phase,
            "phase completed"
        );
        Ok(workflow)
    }

    pub async fn fail_phase(&self, phase: Phase, failure: PhaseFailure) -> DomainResult<Workflow> {
        let mut workflow = self.require_active().await?;
        let message = failure.message.clone();
        workflow.fail_phase(phase, failure, Utc::now());
        let workflow = self.save(workflow).await?;
        warn!(workflow_id = %workflow.workflow_id, phase = phase.number(), error = %message, "phase failed");
        Ok(workflow)
    }

    pub async fn log_user_action(
        &self,
        action: &str,
        decision: &str,
        comment: &str,
    ) -> DomainResult<Workflow> {
        let mut workflow = self.require_active().await?;
        workflow.push_user_action(action, decision, comment, Utc::now());
        self.save(workflow).await
    }

    /// Archive the active workflow and clear the active slot. Safe when
    /// nothing is active.
    pub async fn reset(&self) -> DomainResult<ResetOutcome> {
        let archived = self.store.archive_active(Utc::now()).await?;
        match &archived {
            Some(archive_id) => info!(%archive_id, "workflow archived"),
            None => info!("reset with no active workflow"),
        }
        Ok(ResetOutcome { archived })
    }

    pub async fn can_execute_phase(&self, phase: Phase) -> PhaseGate {
        let Some(workflow) = self.load_active().await else {
            return PhaseGate::denied("No active workflow");
        };
        match phase.previous() {
            None => PhaseGate::allowed(),
            Some(previous) if workflow.phase_status(previous) == PhaseStatus::Completed => {
                PhaseGate::allowed()
            }
            Some(previous) => {
                PhaseGate::denied(format!("Phase {} must be completed first", previous.number()))
            }
        }
    }

    /// Last stored result for `phase`; missing or unreadable yields `None`.
    pub async fn phase_output(&self, phase: Phase) -> Option<StoredPhaseOutput> {
        match self.store.load_phase_output(phase).await {
            Ok(output) => output,
            Err(err) => {
                warn!(phase = phase.number(), error = %err, "phase output unreadable");
                None
            }
        }
    }

    pub async fn history(&self, workflow_id: &str) -> DomainResult<Vec<WorkflowSnapshot>> {
        self.store.history(workflow_id).await
    }

    pub async fn archives(&self) -> DomainResult<Vec<ArchivedWorkflow>> {
        self.store.archives().await
    }
}
