//! Phase 5: publish the migration proof.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::{collaborator, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{Phase, PhaseOutput, ProofMetadata, ProofRecord};
use crate::domain::ports::MetadataUploader;

pub struct GenerateProofPhase {
    uploader: Arc<dyn MetadataUploader>,
}

impl GenerateProofPhase {
    pub fn new(uploader: Arc<dyn MetadataUploader>) -> Self {
        Self { uploader }
    }
}

#[async_trait]
impl PhaseHandler for GenerateProofPhase {
    fn phase(&self) -> Phase {
        Phase::GenerateProof
    }

    fn description(&self) -> &'static str {
        "Bundle the migration results into a proof document and publish it"
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        let request = ctx.validation_request()?;
        let migration = ctx.migration()?;

        let now = Utc::now();
        let proof_metadata = ProofMetadata {
            task_uri: request.task_uri.clone(),
            results: migration.results.clone(),
            summary: migration.summary,
            created_at: now,
        };

        let document = serde_json::to_value(&proof_metadata)
            .map_err(|e| PhaseError::InvalidInput(format!("proof metadata: {e}")))?;
        let uploaded = self
            .uploader
            .upload_metadata(&document, "proof-metadata.json")
            .await
            .map_err(collaborator("Proof upload"))?;

        info!(proof_uri = %uploaded.uri, "proof published");

        Ok(PhaseOutput::GenerateProof(ProofRecord {
            proof_metadata,
            proof_uri: uploaded.uri,
            migration_summary: migration.summary,
            generated_at: now,
        }))
    }
}
