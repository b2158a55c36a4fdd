//! Phase 4: migrate the scanned CIDs to Filecoin-backed storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use super::{collaborator, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{MigrationReport, MigrationSummary, Phase, PhaseOutput};
use crate::domain::ports::StorageMigrator;

pub struct MigrateToStoragePhase {
    storage: Arc<dyn StorageMigrator>,
}

impl MigrateToStoragePhase {
    pub fn new(storage: Arc<dyn StorageMigrator>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl PhaseHandler for MigrateToStoragePhase {
    fn phase(&self) -> Phase {
        Phase::MigrateToStorage
    }

    fn description(&self) -> &'static str {
        "Copy every unique IPFS CID into Filecoin-backed storage"
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        let scan = ctx.scan()?;

        let batch = self
            .storage
            .batch_migrate(&scan.unique_cids)
            .await
            .map_err(collaborator("Batch migration"))?;

        // Summaries are recomputed so counts always match the item list.
        let summary = MigrationSummary::from_items(&batch.results);
        if summary.failed > 0 {
            warn!(failed = summary.failed, total = summary.total, "some CIDs failed to migrate");
        }
        info!(
            successful = summary.successful,
            total = summary.total,
            rate = summary.success_rate,
            "batch migration finished"
        );

        Ok(PhaseOutput::MigrateToStorage(MigrationReport {
            summary,
            results: batch.results,
            migrated_at: Utc::now(),
        }))
    }
}
