//! Phase 1: publish agent metadata and register the agent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::{collaborator, ParamValidation, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{
    AgentMetadata, AgentRegistration, NetworkConfig, Phase, PhaseOutput, PhaseParams,
    WorkflowConfig,
};
use crate::domain::ports::{AgentRegistry, MetadataUploader};

pub struct RegisterAgentPhase {
    agents: Arc<dyn AgentRegistry>,
    uploader: Arc<dyn MetadataUploader>,
    network: NetworkConfig,
    profile: AgentMetadata,
}

impl RegisterAgentPhase {
    pub fn new(
        agents: Arc<dyn AgentRegistry>,
        uploader: Arc<dyn MetadataUploader>,
        network: NetworkConfig,
        profile: AgentMetadata,
    ) -> Self {
        Self {
            agents,
            uploader,
            network,
            profile,
        }
    }
}

#[async_trait]
impl PhaseHandler for RegisterAgentPhase {
    fn phase(&self) -> Phase {
        Phase::RegisterAgent
    }

    fn description(&self) -> &'static str {
        "Publish agent metadata and register the agent in the ERC-8004 identity registry"
    }

    fn validate_params(&self, _config: &WorkflowConfig, params: &PhaseParams) -> ParamValidation {
        let mut errors = Vec::new();
        if let Some(metadata) = &params.agent_metadata {
            if metadata.name.trim().is_empty() {
                errors.push("Agent name cannot be empty".to_string());
            }
            if metadata.description.trim().is_empty() {
                errors.push("Agent description cannot be empty".to_string());
            }
        }
        ParamValidation::from_errors(errors)
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        let now = Utc::now();
        let mut metadata = ctx
            .params
            .agent_metadata
            .clone()
            .unwrap_or_else(|| self.profile.clone());
        metadata.created_at.get_or_insert(now);

        let document = serde_json::to_value(&metadata)
            .map_err(|e| PhaseError::InvalidInput(format!("agent metadata: {e}")))?;
        let uploaded = self
            .uploader
            .upload_metadata(&document, "agent-metadata.json")
            .await
            .map_err(collaborator("Agent metadata upload"))?;

        let receipt = self
            .agents
            .register_agent(&uploaded.uri)
            .await
            .map_err(collaborator("Agent registration"))?;

        info!(agent_id = receipt.agent_id, tx = %receipt.tx_hash, "agent registered");

        Ok(PhaseOutput::RegisterAgent(AgentRegistration {
            agent_id: receipt.agent_id,
            agent_address: receipt.owner,
            metadata_uri: uploaded.uri,
            metadata,
            tx_hash: receipt.tx_hash,
            network: self.network.clone(),
            registered_at: now,
        }))
    }
}
