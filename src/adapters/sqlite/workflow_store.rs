//! SQLite implementation of the WorkflowStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::parse_datetime;
use crate::domain::errors::DomainResult;
use crate::domain::models::{Phase, PhaseOutput, Workflow};
use crate::domain::ports::workflow_store::{
    ArchivedWorkflow, StoredPhaseOutput, WorkflowSnapshot, WorkflowStore,
};

#[derive(Clone)]
pub struct SqliteWorkflowStore {
    pool: SqlitePool,
}

impl SqliteWorkflowStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    sequence: i64,
    workflow_id: String,
    saved_at: String,
    workflow_json: String,
}

impl SnapshotRow {
    fn try_into_snapshot(self) -> DomainResult<WorkflowSnapshot> {
        Ok(WorkflowSnapshot {
            sequence: self.sequence,
            workflow_id: self.workflow_id,
            saved_at: parse_datetime(&self.saved_at)?,
            workflow: serde_json::from_str(&self.workflow_json)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArchiveRow {
    archive_id: String,
    workflow_id: String,
    archived_at: String,
    workflow_json: String,
}

impl ArchiveRow {
    fn try_into_archive(self) -> DomainResult<ArchivedWorkflow> {
        Ok(ArchivedWorkflow {
            archive_id: self.archive_id,
            workflow_id: self.workflow_id,
            archived_at: parse_datetime(&self.archived_at)?,
            workflow: serde_json::from_str(&self.workflow_json)?,
        })
    }
}

#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    async fn load_active(&self) -> DomainResult<Option<Workflow>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT workflow_json FROM active_workflow WHERE slot = 1")
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, workflow: &Workflow) -> DomainResult<()> {
        let workflow_json = serde_json::to_string(workflow)?;
        let saved_at = workflow.updated_at.to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO active_workflow (slot, workflow_id, status, current_phase, workflow_json, updated_at)
             VALUES (1, ?, ?, ?, ?, ?)
             ON CONFLICT(slot) DO UPDATE SET
                workflow_id = excluded.workflow_id,
                status = excluded.status,
                current_phase = excluded.current_phase,
                workflow_json = excluded.workflow_json,
                updated_at = excluded.updated_at",
        )
        .bind(&workflow.workflow_id)
        .bind(workflow.status.as_str())
        .bind(i64::from(workflow.current_phase))
        .bind(&workflow_json)
        .bind(&saved_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO workflow_history (workflow_id, saved_at, workflow_json) VALUES (?, ?, ?)",
        )
        .bind(&workflow.workflow_id)
        .bind(&saved_at)
        .bind(&workflow_json)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(workflow_id = %workflow.workflow_id, status = %workflow.status, "workflow saved");
        Ok(())
    }

    async fn save_phase_output(
        &self,
        workflow_id: &str,
        phase: Phase,
        output: &PhaseOutput,
    ) -> DomainResult<()> {
        let output_json = serde_json::to_string(output)?;

        sqlx::query(
            "INSERT INTO phase_outputs (phase, workflow_id, saved_at, output_json)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(phase) DO UPDATE SET
                workflow_id = excluded.workflow_id,
                saved_at = excluded.saved_at,
                output_json = excluded.output_json",
        )
        .bind(i64::from(phase.number()))
        .bind(workflow_id)
        .bind(Utc::now().to_rfc3339())
        .bind(&output_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_phase_output(&self, phase: Phase) -> DomainResult<Option<StoredPhaseOutput>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT workflow_id, saved_at, output_json FROM phase_outputs WHERE phase = ?",
        )
        .bind(i64::from(phase.number()))
        .fetch_optional(&self.pool)
        .await?;

        let Some((workflow_id, saved_at, output_json)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredPhaseOutput {
            phase,
            workflow_id,
            saved_at: parse_datetime(&saved_at)?,
            output: serde_json::from_str(&output_json)?,
        }))
    }

    async fn archive_active(&self, archived_at: DateTime<Utc>) -> DomainResult<Option<String>> {
        let mut tx = self.pool.begin().await?;

        // Raw columns only, so an undecodable record can still be archived.
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT workflow_id, workflow_json FROM active_workflow WHERE slot = 1")
                .fetch_optional(&mut *tx)
                .await?;

        let archive_id = match row {
            Some((workflow_id, workflow_json)) => {
                let archive_id =
                    format!("{workflow_id}-archived-{}", archived_at.timestamp_millis());
                sqlx::query(
                    "INSERT OR REPLACE INTO workflow_archives (archive_id, workflow_id, archived_at, workflow_json)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(&archive_id)
                .bind(&workflow_id)
                .bind(archived_at.to_rfc3339())
                .bind(&workflow_json)
                .execute(&mut *tx)
                .await?;
                Some(archive_id)
            }
            None => None,
        };

        sqlx::query("DELETE FROM active_workflow").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM phase_outputs").execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(archive_id)
    }

    async fn history(&self, workflow_id: &str) -> DomainResult<Vec<WorkflowSnapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            "SELECT sequence, workflow_id, saved_at, workflow_json
             FROM workflow_history WHERE workflow_id = ? ORDER BY sequence ASC",
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SnapshotRow::try_into_snapshot).collect()
    }

    async fn archives(&self) -> DomainResult<Vec<ArchivedWorkflow>> {
        let rows: Vec<ArchiveRow> = sqlx::query_as(
            "SELECT archive_id, workflow_id, archived_at, workflow_json
             FROM workflow_archives ORDER BY archived_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut archives = Vec::with_capacity(rows.len());
        for row in rows {
            let archive_id = row.archive_id.clone();
            match row.try_into_archive() {
                Ok(archive) => archives.push(archive),
                Err(err) => warn!(%archive_id, error = %err, "skipping unreadable archive"),
            }
        }
        Ok(archives)
    }
}
