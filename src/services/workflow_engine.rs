//! Phase-by-phase workflow engine.
//!
//! The `WorkflowEngine` is the single entry point the CLI drives. It enforces
//! phase ordering, persists every transition through `WorkflowStateService`
//! before and after a handler runs, and turns handler failures into
//! retryable outcomes instead of errors.
//!
//! Precondition problems (no workflow, wrong order, bad parameters) come back
//! as `Err(DomainError)` before anything is written. Collaborator failures
//! come back as `Ok(PhaseOutcome::Failed)` after the failure is recorded.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    FinalReport, NewWorkflow, Phase, PhaseFailure, PhaseOutput, PhaseParams, PhaseStatus,
    Workflow, WorkflowConfig, WorkflowStatus,
};
use crate::domain::ports::workflow_store::{ArchivedWorkflow, WorkflowSnapshot, WorkflowStore};
use crate::services::phases::{ParamValidation, PhaseContext, PhaseRegistry};
use crate::services::state_service::{ResetOutcome, WorkflowStateService};

/// What the operator should do after a successful phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "phase", rename_all = "snake_case")]
pub enum NextAction {
    ContinueTo(Phase),
    WorkflowCompleted,
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinueTo(phase) => write!(f, "Continue to Phase {}", phase.number()),
            Self::WorkflowCompleted => f.write_str("Workflow completed"),
        }
    }
}

/// Result of running (or declining to run) a phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Completed {
        phase: Phase,
        result: PhaseOutput,
        next_action: NextAction,
    },
    Failed {
        phase: Phase,
        error: String,
        trace: Vec<String>,
        can_retry: bool,
    },
    AlreadyCompleted {
        current_phase: u8,
    },
}

impl PhaseOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Returned by `start_new_workflow`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedWorkflow {
    pub workflow_id: String,
    pub next_phase: Phase,
    pub config: WorkflowConfig,
}

/// Per-phase line of a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub title: &'static str,
    pub status: PhaseStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub current_phase: u8,
    pub progress: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub phases: Vec<PhaseSummary>,
    pub next_action: String,
    /// A phase left `in_progress` by an interrupted run.
    pub orphaned_phase: Option<Phase>,
    pub error_count: usize,
}

impl WorkflowSummary {
    fn of(workflow: &Workflow) -> Self {
        let phases = Phase::ALL
            .iter()
            .map(|phase| {
                let record = workflow.record(*phase).cloned().unwrap_or_default();
                PhaseSummary {
                    phase: *phase,
                    title: phase.title(),
                    status: record.status,
                    attempts: record.attempts,
                    completed_at: record.completed_at,
                    error: record.error.map(|e| e.message),
                }
            })
            .collect();

        Self {
            workflow_id: workflow.workflow_id.clone(),
            status: workflow.status,
            current_phase: workflow.current_phase,
            progress: workflow.progress(),
            created_at: workflow.created_at,
            updated_at: workflow.updated_at,
            phases,
            next_action: workflow.next_action(),
            orphaned_phase: workflow.orphaned_phase(),
            error_count: workflow.errors.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusReport {
    NoActiveWorkflow,
    Active(WorkflowSummary),
}

impl StatusReport {
    pub const fn has_active_workflow(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Stored result of one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseResultView {
    pub phase: Phase,
    pub available: bool,
    pub status: PhaseStatus,
    pub result: Option<PhaseOutput>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Static description of a phase plus its status in the active workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseInfo {
    pub phase: Phase,
    pub name: &'static str,
    pub description: &'static str,
    pub status: Option<PhaseStatus>,
}

pub struct WorkflowEngine<S: WorkflowStore> {
    state: WorkflowStateService<S>,
    phases: PhaseRegistry,
    defaults: WorkflowConfig,
}

impl<S: WorkflowStore> WorkflowEngine<S> {
    pub const fn new(
        state: WorkflowStateService<S>,
        phases: PhaseRegistry,
        defaults: WorkflowConfig,
    ) -> Self {
        Self {
            state,
            phases,
            defaults,
        }
    }

    pub const fn state(&self) -> &WorkflowStateService<S> {
        &self.state
    }

    async fn require_active(&self) -> DomainResult<Workflow> {
        self.state
            .load_active()
            .await
            .ok_or(DomainError::NoActiveWorkflow)
    }

    fn parse_phase(number: u8) -> DomainResult<Phase> {
        Phase::from_number(number).ok_or(DomainError::InvalidPhase(number))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a workflow. A completed workflow in the active slot is archived
    /// first; any other active workflow blocks the start.
    #[instrument(skip(self, request))]
    pub async fn start_new_workflow(&self, request: NewWorkflow) -> DomainResult<StartedWorkflow> {
        if let Some(active) = self.state.load_active().await {
            if active.status != WorkflowStatus::Completed {
                return Err(DomainError::Precondition(format!(
                    "Active workflow exists ({}). Please complete or reset it first.",
                    active.workflow_id
                )));
            }
            self.state.reset().await?;
        }

        let workflow = self
            .state
            .create_workflow(request.into_config(&self.defaults))
            .await?;

        Ok(StartedWorkflow {
            workflow_id: workflow.workflow_id,
            next_phase: Phase::RegisterAgent,
            config: workflow.config,
        })
    }

    pub async fn reset_workflow(&self) -> DomainResult<ResetOutcome> {
        self.state.reset().await
    }

    // ========================================================================
    // Phase execution
    // ========================================================================

    /// Run phase `number` against the active workflow.
    pub async fn execute_phase(&self, number: u8, params: PhaseParams) -> DomainResult<PhaseOutcome> {
        let phase = Self::parse_phase(number)?;
        self.run_phase(phase, params).await
    }

    #[instrument(skip(self, params), fields(phase = phase.number()))]
    async fn run_phase(&self, phase: Phase, params: PhaseParams) -> DomainResult<PhaseOutcome> {
        let workflow = self.require_active().await?;
        let gate = self.state.can_execute_phase(phase).await;
        if !gate.allowed {
            return Err(DomainError::Precondition(gate.reason.unwrap_or_default()));
        }

        if workflow.phase_status(phase) == PhaseStatus::Completed {
            return Err(DomainError::Precondition(format!(
                "Phase {} is already completed",
                phase.number()
            )));
        }

        let handler = self.phases.get(phase).ok_or_else(|| {
            DomainError::Precondition(format!("No handler registered for Phase {}", phase.number()))
        })?;

        let validation = handler.validate_params(&workflow.config.merged_with(&params), &params);
        if !validation.valid {
            return Err(DomainError::InvalidParams(validation.errors));
        }

        // Context comes from the workflow this save returns, never an earlier read.
        let workflow = self.state.start_phase(phase).await?;
        let ctx = PhaseContext::new(workflow, phase, params);

        info!(phase = phase.number(), name = handler.name(), "executing phase");
        let result = handler.execute(&ctx).await;

        let failure = match result {
            Ok(output) if output.phase() == phase => {
                self.state.complete_phase(phase, output.clone()).await?;
                let next_action = phase
                    .next()
                    .map_or(NextAction::WorkflowCompleted, NextAction::ContinueTo);
                return Ok(PhaseOutcome::Completed {
                    phase,
                    result: output,
                    next_action,
                });
            }
            Ok(output) => PhaseFailure::new(format!(
                "{} handler returned a result for {}",
                phase,
                output.phase()
            )),
            Err(err) => PhaseFailure::from_error(&err),
        };

        self.state.fail_phase(phase, failure.clone()).await?;
        Ok(PhaseOutcome::Failed {
            phase,
            error: failure.message,
            trace: failure.trace,
            can_retry: true,
        })
    }

    /// Run the phase after `current_phase`.
    pub async fn continue_to_next_phase(&self, params: PhaseParams) -> DomainResult<PhaseOutcome> {
        let workflow = self.require_active().await?;
        match workflow.frontier() {
            Some(next) => self.run_phase(next, params).await,
            None => Ok(PhaseOutcome::AlreadyCompleted {
                current_phase: workflow.current_phase,
            }),
        }
    }

    /// Re-run the phase that failed or was interrupted; otherwise the current one.
    ///
    /// `current_phase` only advances on success, so a failed or orphaned phase
    /// sits at `current_phase + 1`. Retrying `current_phase` there would re-run
    /// a completed phase.
    pub async fn retry_current_phase(&self, params: PhaseParams) -> DomainResult<PhaseOutcome> {
        let workflow = self.require_active().await?;
        let target = match workflow.frontier() {
            Some(frontier)
                if matches!(
                    workflow.phase_status(frontier),
                    PhaseStatus::Failed | PhaseStatus::InProgress
                ) =>
            {
                frontier
            }
            _ => Self::parse_phase(workflow.current_phase.max(1))?,
        };
        if workflow.orphaned_phase() == Some(target) {
            warn!(phase = target.number(), "retrying interrupted phase");
        }
        self.run_phase(target, params).await
    }

    /// Run phase `number`, which may be any phase up to the frontier.
    pub async fn jump_to_phase(&self, number: u8, params: PhaseParams) -> DomainResult<PhaseOutcome> {
        let phase = Self::parse_phase(number)?;
        let workflow = self.require_active().await?;
        if number > workflow.current_phase + 1 {
            return Err(DomainError::Precondition(format!(
                "Cannot jump to Phase {number}. Complete previous phases first."
            )));
        }
        self.run_phase(phase, params).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_status(&self) -> StatusReport {
        match self.state.load_active().await {
            Some(workflow) => StatusReport::Active(WorkflowSummary::of(&workflow)),
            None => StatusReport::NoActiveWorkflow,
        }
    }

    pub async fn phase_result(&self, number: u8) -> DomainResult<PhaseResultView> {
        let phase = Self::parse_phase(number)?;
        let workflow = self.require_active().await?;
        let record = workflow.record(phase).cloned().unwrap_or_default();

        let result = if record.status == PhaseStatus::Completed {
            match self.state.phase_output(phase).await {
                Some(stored) if stored.workflow_id == workflow.workflow_id => Some(stored.output),
                _ => record.result,
            }
        } else {
            None
        };

        Ok(PhaseResultView {
            phase,
            available: result.is_some(),
            status: record.status,
            result,
            completed_at: record.completed_at,
        })
    }

    /// Record an operator decision in the audit trail.
    pub async fn log_user_decision(
        &self,
        action: &str,
        decision: &str,
        comment: &str,
    ) -> DomainResult<()> {
        self.state.log_user_action(action, decision, comment).await?;
        Ok(())
    }

    pub async fn list_phases(&self) -> Vec<PhaseInfo> {
        let workflow = self.state.load_active().await;
        self.phases
            .handlers()
            .map(|handler| PhaseInfo {
                phase: handler.phase(),
                name: handler.name(),
                description: handler.description(),
                status: workflow.as_ref().map(|wf| wf.phase_status(handler.phase())),
            })
            .collect()
    }

    /// Check parameters for phase `number` without running it.
    pub async fn validate_phase_params(
        &self,
        number: u8,
        params: &PhaseParams,
    ) -> DomainResult<ParamValidation> {
        let phase = Self::parse_phase(number)?;
        let handler = self.phases.get(phase).ok_or_else(|| {
            DomainError::Precondition(format!("No handler registered for Phase {number}"))
        })?;
        let base = self
            .state
            .load_active()
            .await
            .map_or_else(|| self.defaults.clone(), |wf| wf.config);
        Ok(handler.validate_params(&base.merged_with(params), params))
    }

    /// The phase 7 report of the active workflow.
    pub async fn full_report(&self) -> DomainResult<FinalReport> {
        let workflow = self.require_active().await?;
        if !workflow.is_complete() {
            return Err(DomainError::Precondition("Workflow not completed yet".to_string()));
        }
        match workflow.record(Phase::FinalReport).and_then(|r| r.result.clone()) {
            Some(PhaseOutput::FinalReport(report)) => Ok(*report),
            _ => Err(DomainError::Precondition(
                "Final report result is missing".to_string(),
            )),
        }
    }

    /// History snapshots of the active workflow.
    pub async fn history(&self) -> DomainResult<Vec<WorkflowSnapshot>> {
        let workflow = self.require_active().await?;
        self.state.history(&workflow.workflow_id).await
    }

    pub async fn archives(&self) -> DomainResult<Vec<ArchivedWorkflow>> {
        self.state.archives().await
    }
}
