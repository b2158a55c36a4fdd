//! Phase 6: submit the validator's response.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::{collaborator, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{
    ApprovalPolicy, DecisionSource, Phase, PhaseOutput, ValidationResponseRecord,
};
use crate::domain::ports::ValidationRegistry;

pub struct SubmitValidationPhase {
    validations: Arc<dyn ValidationRegistry>,
    policy: ApprovalPolicy,
}

impl SubmitValidationPhase {
    pub fn new(validations: Arc<dyn ValidationRegistry>, policy: ApprovalPolicy) -> Self {
        Self {
            validations,
            policy,
        }
    }
}

#[async_trait]
impl PhaseHandler for SubmitValidationPhase {
    fn phase(&self) -> Phase {
        Phase::SubmitValidation
    }

    fn description(&self) -> &'static str {
        "Approve or reject the migration and record the response on chain"
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        let request = ctx.validation_request()?;
        let proof = ctx.proof()?;

        let approved = self.policy.decide(ctx.params.approved, &proof.migration_summary);
        let decided_by = if ctx.params.approved.is_some() {
            DecisionSource::Operator
        } else {
            DecisionSource::Policy
        };

        let receipt = self
            .validations
            .submit_validation_response(&request.request_hash, approved, &proof.proof_uri)
            .await
            .map_err(collaborator("Validation response"))?;

        info!(approved, ?decided_by, tx = %receipt.tx_hash, "validation response submitted");

        Ok(PhaseOutput::SubmitValidation(ValidationResponseRecord {
            approved,
            decided_by,
            request_hash: request.request_hash.clone(),
            proof_uri: proof.proof_uri.clone(),
            validator_address: request.validator_address.clone(),
            tx_hash: receipt.tx_hash,
            submitted_at: Utc::now(),
        }))
    }
}
