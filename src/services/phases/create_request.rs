//! Phase 3: publish the task document and open a validation request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::{collaborator, is_valid_address, ParamValidation, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{
    NftTarget, Phase, PhaseOutput, PhaseParams, TaskMetadata, ValidationRequestRecord,
    WorkflowConfig,
};
use crate::domain::ports::{MetadataUploader, ValidationRegistry};

pub struct CreateValidationRequestPhase {
    validations: Arc<dyn ValidationRegistry>,
    uploader: Arc<dyn MetadataUploader>,
}

impl CreateValidationRequestPhase {
    pub fn new(validations: Arc<dyn ValidationRegistry>, uploader: Arc<dyn MetadataUploader>) -> Self {
        Self {
            validations,
            uploader,
        }
    }
}

#[async_trait]
impl PhaseHandler for CreateValidationRequestPhase {
    fn phase(&self) -> Phase {
        Phase::CreateValidationRequest
    }

    fn description(&self) -> &'static str {
        "Publish the migration task and ask a validator to review it"
    }

    fn validate_params(&self, config: &WorkflowConfig, _params: &PhaseParams) -> ParamValidation {
        match config.validator_address.as_deref() {
            None => ParamValidation::from_errors(vec![
                "Validator address is required (set --validator or VALIDATOR_ADDRESS)".to_string(),
            ]),
            Some(address) if !is_valid_address(address) => {
                ParamValidation::from_errors(vec![format!("Invalid validator address: '{address}'")])
            }
            Some(_) => ParamValidation::ok(),
        }
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        let agent = ctx.agent()?;
        let scan = ctx.scan()?;
        let validator = ctx
            .config
            .validator_address
            .clone()
            .ok_or_else(|| PhaseError::InvalidInput("validator address is not configured".into()))?;

        let now = Utc::now();
        let task_metadata = TaskMetadata {
            task: format!("Migrate {} IPFS CIDs to Filecoin", scan.unique_cids.len()),
            nft: NftTarget {
                contract: ctx.config.nft_contract.clone(),
                token_range: scan.scanned_range,
            },
            ipfs_cids: scan.unique_cids.clone(),
            created_at: now,
            requester: agent.agent_address.clone(),
        };

        let document = serde_json::to_value(&task_metadata)
            .map_err(|e| PhaseError::InvalidInput(format!("task metadata: {e}")))?;
        let uploaded = self
            .uploader
            .upload_metadata(&document, "task-metadata.json")
            .await
            .map_err(collaborator("Task metadata upload"))?;

        let receipt = self
            .validations
            .create_validation_request(agent.agent_id, &uploaded.uri, &validator)
            .await
            .map_err(collaborator("Validation request"))?;

        info!(request_hash = %receipt.request_hash, validator = %validator, "validation request created");

        Ok(PhaseOutput::CreateValidationRequest(ValidationRequestRecord {
            request_hash: receipt.request_hash,
            task_uri: uploaded.uri,
            task_metadata,
            validator_address: validator,
            agent_id: agent.agent_id,
            tx_hash: receipt.tx_hash,
            created_at: now,
        }))
    }
}
