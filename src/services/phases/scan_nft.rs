//! Phase 2: scan the NFT contract for IPFS content.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::{collaborator, is_valid_address, ParamValidation, PhaseContext, PhaseError, PhaseHandler};
use crate::domain::models::{NftScanReport, Phase, PhaseOutput, PhaseParams, TokenRange, WorkflowConfig};
use crate::domain::ports::NftScanner;

pub struct ScanNftPhase {
    scanner: Arc<dyn NftScanner>,
    max_span: u64,
}

impl ScanNftPhase {
    pub fn new(scanner: Arc<dyn NftScanner>, max_span: u64) -> Self {
        Self { scanner, max_span }
    }
}

#[async_trait]
impl PhaseHandler for ScanNftPhase {
    fn phase(&self) -> Phase {
        Phase::ScanNft
    }

    fn description(&self) -> &'static str {
        "Read token URIs in the configured range and collect unique IPFS CIDs"
    }

    fn validate_params(&self, config: &WorkflowConfig, _params: &PhaseParams) -> ParamValidation {
        let mut errors = Vec::new();
        if !is_valid_address(&config.nft_contract) {
            errors.push(format!("Invalid NFT contract address: '{}'", config.nft_contract));
        }
        if config.start_token_id > config.end_token_id {
            errors.push(format!(
                "Start token ID ({}) must be <= end token ID ({})",
                config.start_token_id, config.end_token_id
            ));
        } else {
            let span = TokenRange {
                start: config.start_token_id,
                end: config.end_token_id,
            }
            .len();
            match span {
                Some(span) if span <= self.max_span => {}
                Some(span) => errors.push(format!(
                    "Token range covers {span} tokens; at most {} may be scanned at once",
                    self.max_span
                )),
                None => errors.push(format!(
                    "Token range covers more than {} tokens; at most {} may be scanned at once",
                    u64::MAX,
                    self.max_span
                )),
            }
        }
        ParamValidation::from_errors(errors)
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        ctx.agent()?;

        let range = TokenRange {
            start: ctx.config.start_token_id,
            end: ctx.config.end_token_id,
        };
        let outcome = self
            .scanner
            .scan(&ctx.config.nft_contract, range)
            .await
            .map_err(collaborator("NFT scan"))?;

        info!(
            contract = %ctx.config.nft_contract,
            tokens = outcome.summary.total,
            unique_cids = outcome.unique_cids.len(),
            "NFT scan finished"
        );

        Ok(PhaseOutput::ScanNft(NftScanReport {
            contract_info: outcome.contract_info,
            scan_summary: outcome.summary,
            unique_cids: outcome.unique_cids,
            token_details: outcome.results,
            scanned_range: range,
            scanned_at: Utc::now(),
        }))
    }
}
