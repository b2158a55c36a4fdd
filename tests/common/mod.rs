//! Shared fixtures for the integration tests.
//!
//! `StubPhase` handlers return canned results, record the context they were
//! given and can be told to fail their next run.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use nftmigrate::adapters::sqlite::{create_migrated_test_pool, SqliteWorkflowStore};
use nftmigrate::domain::models::{
    AgentMetadata, AgentRegistration, AgentSection, ContractInfo, DecisionSource, FinalReport,
    MigrationItem, MigrationReport, MigrationSummary, NetworkConfig, NetworkNames, NftScanReport,
    NftScanSection, NftTarget, Phase, PhaseOutput, ProofMetadata, ProofRecord, ScanSummary,
    TaskMetadata, TokenRange, ValidationRequestRecord, ValidationResponseRecord,
    ValidationSection, WorkflowConfig,
};
use nftmigrate::domain::ports::CollaboratorError;
use nftmigrate::services::phases::{PhaseContext, PhaseError, PhaseHandler, PhaseRegistry};
use nftmigrate::services::{WorkflowEngine, WorkflowStateService};

pub const CONTRACT: &str = "0xABC0000000000000000000000000000000000001";
pub const VALIDATOR: &str = "0x00000000000000000000000000000000000000aa";

pub type Engine = WorkflowEngine<SqliteWorkflowStore>;

/// What a stub saw when it ran: its phase and the prior results present.
pub type ContextLog = Arc<Mutex<Vec<(Phase, Vec<Phase>)>>>;

pub struct StubPhase {
    phase: Phase,
    failures: Mutex<VecDeque<String>>,
    log: ContextLog,
}

impl StubPhase {
    pub fn new(phase: Phase, log: ContextLog) -> Self {
        Self {
            phase,
            failures: Mutex::new(VecDeque::new()),
            log,
        }
    }

    /// Fail the next run with a network timeout carrying `message`.
    pub fn fail_next(&self, message: &str) {
        self.failures.lock().unwrap().push_back(message.to_string());
    }
}

#[async_trait]
impl PhaseHandler for StubPhase {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn description(&self) -> &'static str {
        "stub"
    }

    async fn execute(&self, ctx: &PhaseContext) -> Result<PhaseOutput, PhaseError> {
        self.log
            .lock()
            .unwrap()
            .push((self.phase, ctx.prior.phases()));

        if let Some(message) = self.failures.lock().unwrap().pop_front() {
            return Err(PhaseError::Collaborator {
                operation: "Stub call",
                source: CollaboratorError::Timeout(message),
            });
        }
        Ok(sample_output(self.phase))
    }
}

/// Engine over an in-memory database with stub handlers for every phase.
pub struct StubHarness {
    pub engine: Engine,
    pub stubs: Vec<Arc<StubPhase>>,
    pub log: ContextLog,
}

impl StubHarness {
    pub async fn new() -> Self {
        let log: ContextLog = Arc::default();
        let stubs: Vec<Arc<StubPhase>> = Phase::ALL
            .iter()
            .map(|phase| Arc::new(StubPhase::new(*phase, log.clone())))
            .collect();

        let registry = stubs.iter().fold(PhaseRegistry::default(), |registry, stub| {
            registry.with_handler(stub.clone())
        });

        let pool = create_migrated_test_pool().await.unwrap();
        let state = WorkflowStateService::new(Arc::new(SqliteWorkflowStore::new(pool)));
        Self {
            engine: WorkflowEngine::new(state, registry, default_config()),
            stubs,
            log,
        }
    }

    pub fn stub(&self, phase: Phase) -> &StubPhase {
        &self.stubs[usize::from(phase.number() - 1)]
    }

    pub fn contexts(&self) -> Vec<(Phase, Vec<Phase>)> {
        self.log.lock().unwrap().clone()
    }
}

pub fn default_config() -> WorkflowConfig {
    WorkflowConfig {
        nft_contract: CONTRACT.to_string(),
        start_token_id: 0,
        end_token_id: 4,
        validator_address: Some(VALIDATOR.to_string()),
        extra: Default::default(),
    }
}

fn summary() -> MigrationSummary {
    MigrationSummary::from_counts(2, 2)
}

fn items() -> Vec<MigrationItem> {
    ["cid1", "cid2"]
        .iter()
        .map(|cid| MigrationItem {
            source_cid: (*cid).to_string(),
            destination_id: Some(format!("piece-{cid}")),
            success: true,
            error: None,
            size_bytes: Some(10),
        })
        .collect()
}

/// A plausible result for `phase`.
pub fn sample_output(phase: Phase) -> PhaseOutput {
    let now = Utc::now();
    match phase {
        Phase::RegisterAgent => PhaseOutput::RegisterAgent(AgentRegistration {
            agent_id: 42,
            agent_address: "0x5a1e000000000000000000000000000000005a1e".into(),
            metadata_uri: "ipfs://agent".into(),
            metadata: AgentMetadata::default(),
            tx_hash: "0xT1".into(),
            network: NetworkConfig {
                name: "Sepolia Testnet".into(),
                chain_id: 11_155_111,
                rpc_url: "https://sepolia.example".into(),
            },
            registered_at: now,
        }),
        Phase::ScanNft => PhaseOutput::ScanNft(NftScanReport {
            contract_info: ContractInfo {
                address: CONTRACT.into(),
                name: Some("Stub".into()),
                symbol: None,
                total_supply: Some(5),
            },
            scan_summary: ScanSummary {
                total: 5,
                with_ipfs: 2,
                failed: 0,
            },
            unique_cids: vec!["cid1".into(), "cid2".into()],
            token_details: Vec::new(),
            scanned_range: TokenRange { start: 0, end: 4 },
            scanned_at: now,
        }),
        Phase::CreateValidationRequest => {
            PhaseOutput::CreateValidationRequest(ValidationRequestRecord {
                request_hash: "0xR1".into(),
                task_uri: "ipfs://task".into(),
                task_metadata: TaskMetadata {
                    task: "Migrate 2 IPFS CIDs to Filecoin".into(),
                    nft: NftTarget {
                        contract: CONTRACT.into(),
                        token_range: TokenRange { start: 0, end: 4 },
                    },
                    ipfs_cids: vec!["cid1".into(), "cid2".into()],
                    created_at: now,
                    requester: "0x5a1e".into(),
                },
                validator_address: VALIDATOR.into(),
                agent_id: 42,
                tx_hash: "0xT3".into(),
                created_at: now,
            })
        }
        Phase::MigrateToStorage => PhaseOutput::MigrateToStorage(MigrationReport {
            summary: summary(),
            results: items(),
            migrated_at: now,
        }),
        Phase::GenerateProof => PhaseOutput::GenerateProof(ProofRecord {
            proof_metadata: ProofMetadata {
                task_uri: "ipfs://task".into(),
                results: items(),
                summary: summary(),
                created_at: now,
            },
            proof_uri: "ipfs://proof".into(),
            migration_summary: summary(),
            generated_at: now,
        }),
        Phase::SubmitValidation => PhaseOutput::SubmitValidation(ValidationResponseRecord {
            approved: true,
            decided_by: DecisionSource::Policy,
            request_hash: "0xR1".into(),
            proof_uri: "ipfs://proof".into(),
            validator_address: VALIDATOR.into(),
            tx_hash: "0xT6".into(),
            submitted_at: now,
        }),
        Phase::FinalReport => PhaseOutput::FinalReport(Box::new(FinalReport {
            title: "NFT IPFS to Filecoin Migration - Complete Report".into(),
            workflow_id: "stub".into(),
            completed_at: now,
            agent: AgentSection {
                agent_id: 42,
                address: "0x5a1e".into(),
                metadata_uri: "ipfs://agent".into(),
                registration_tx: "0xT1".into(),
                is_active: true,
            },
            nft_scan: NftScanSection {
                contract: ContractInfo {
                    address: CONTRACT.into(),
                    name: None,
                    symbol: None,
                    total_supply: None,
                },
                scanned_tokens: 5,
                unique_cids: 2,
            },
            validation: ValidationSection {
                request_hash: "0xR1".into(),
                validator: VALIDATOR.into(),
                status: "approved".into(),
                is_valid: true,
                approved: true,
                request_tx: "0xT3".into(),
                response_tx: "0xT6".into(),
            },
            migration: summary(),
            networks: NetworkNames {
                nft: "Ethereum Mainnet".into(),
                validation: "Sepolia Testnet".into(),
                filecoin: "Filecoin Calibration".into(),
            },
        })),
    }
}
