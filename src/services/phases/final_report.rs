//! Phase 7: assemble the final report with live registry state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::{collaborator, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{
    AgentSection, FinalReport, NetworkNames, NetworksConfig, NftScanSection, Phase, PhaseOutput,
    ValidationSection,
};
use crate::domain::ports::{AgentRegistry, ValidationRegistry};

pub const REPORT_TITLE: &str = "NFT IPFS to Filecoin Migration - Complete Report";

pub struct FinalReportPhase {
    agents: Arc<dyn AgentRegistry>,
    validations: Arc<dyn ValidationRegistry>,
    networks: NetworksConfig,
}

impl FinalReportPhase {
    pub fn new(
        agents: Arc<dyn AgentRegistry>,
        validations: Arc<dyn ValidationRegistry>,
        networks: NetworksConfig,
    ) -> Self {
        Self {
            agents,
            validations,
            networks,
        }
    }
}

#[async_trait]
impl PhaseHandler for FinalReportPhase {
    fn phase(&self) -> Phase {
        Phase::FinalReport
    }

    fn description(&self) -> &'static str {
        "Aggregate every phase result and the live registry state into one report"
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        let agent = ctx.agent()?;
        let scan = ctx.scan()?;
        let request = ctx.validation_request()?;
        let migration = ctx.migration()?;
        let response = ctx.validation_response()?;

        let agent_info = self
            .agents
            .get_agent(agent.agent_id)
            .await
            .map_err(collaborator("Agent lookup"))?;
        let request_info = self
            .validations
            .get_validation_request(&request.request_hash)
            .await
            .map_err(collaborator("Validation lookup"))?;

        let report = FinalReport {
            title: REPORT_TITLE.to_string(),
            workflow_id: ctx.workflow.workflow_id.clone(),
            completed_at: Utc::now(),
            agent: AgentSection {
                agent_id: agent.agent_id,
                address: agent.agent_address.clone(),
                metadata_uri: agent.metadata_uri.clone(),
                registration_tx: agent.tx_hash.clone(),
                is_active: agent_info.is_active,
            },
            nft_scan: NftScanSection {
                contract: scan.contract_info.clone(),
                scanned_tokens: scan.scan_summary.total,
                unique_cids: scan.unique_cids.len(),
            },
            validation: ValidationSection {
                request_hash: request.request_hash.clone(),
                validator: request.validator_address.clone(),
                status: request_info.status,
                is_valid: request_info.is_valid,
                approved: response.approved,
                request_tx: request.tx_hash.clone(),
                response_tx: response.tx_hash.clone(),
            },
            migration: migration.summary,
            networks: NetworkNames {
                nft: self.networks.nft.name.clone(),
                validation: self.networks.validation.name.clone(),
                filecoin: self.networks.filecoin.name.clone(),
            },
        };

        info!(workflow_id = %report.workflow_id, "final report generated");
        Ok(PhaseOutput::FinalReport(Box::new(report)))
    }
}
