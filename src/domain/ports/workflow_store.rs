//! Workflow store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Phase, PhaseOutput, Workflow};

/// One immutable history entry, written on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub sequence: i64,
    pub workflow_id: String,
    pub saved_at: DateTime<Utc>,
    pub workflow: Workflow,
}

/// A workflow moved out of the active slot by a reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedWorkflow {
    /// `<workflow_id>-archived-<unix millis>`
    pub archive_id: String,
    pub workflow_id: String,
    pub archived_at: DateTime<Utc>,
    pub workflow: Workflow,
}

/// The last result written for one phase number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPhaseOutput {
    pub phase: Phase,
    pub workflow_id: String,
    pub saved_at: DateTime<Utc>,
    pub output: PhaseOutput,
}

/// Durable storage for the active workflow, its history and side records.
///
/// Implementations return `Err` for unreadable data; callers decide whether
/// to degrade.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Load the workflow in the active slot.
    async fn load_active(&self) -> DomainResult<Option<Workflow>>;

    /// Overwrite the active slot and append a history snapshot, atomically.
    async fn save(&self, workflow: &Workflow) -> DomainResult<()>;

    /// Replace the side record for `phase`.
    async fn save_phase_output(
        &self,
        workflow_id: &str,
        phase: Phase,
        output: &PhaseOutput,
    ) -> DomainResult<()>;

    /// Read the side record for `phase` without loading the workflow.
    async fn load_phase_output(&self, phase: Phase) -> DomainResult<Option<StoredPhaseOutput>>;

    /// Move the active workflow to the archive and clear the active slot and
    /// all phase side records. Returns the archive id, or `None` when the
    /// slot was already empty.
    async fn archive_active(&self, archived_at: DateTime<Utc>) -> DomainResult<Option<String>>;

    /// History snapshots for one workflow, oldest first.
    async fn history(&self, workflow_id: &str) -> DomainResult<Vec<WorkflowSnapshot>>;

    /// All archived workflows, newest first.
    async fn archives(&self) -> DomainResult<Vec<ArchivedWorkflow>>;
}
