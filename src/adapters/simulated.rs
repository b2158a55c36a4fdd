//! In-process collaborators for offline runs and tests.
//!
//! `SimulatedCollaborators` implements every collaborator port against an
//! in-memory ledger. Output is deterministic for a given call sequence, and
//! failures can be queued per operation. A persistent simulator writes its
//! ledger to a JSON file after every change so separate CLI invocations see
//! the same agents and validation requests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::domain::models::{
    ContractInfo, MigrationItem, MigrationSummary, ScanSummary, TokenRange, TokenScan,
};
use crate::domain::ports::{
    AgentInfo, AgentReceipt, AgentRegistry, BatchMigration, CollaboratorError,
    CollaboratorResult, Collaborators, MetadataUploader, NftScanner, ScanOutcome,
    StorageMigrator, UploadedMetadata, ValidationRegistry, ValidationRequestInfo,
    ValidationRequestReceipt, ValidationResponseReceipt,
};

pub const OP_REGISTER_AGENT: &str = "register_agent";
pub const OP_GET_AGENT: &str = "get_agent";
pub const OP_SCAN: &str = "scan";
pub const OP_BATCH_MIGRATE: &str = "batch_migrate";
pub const OP_UPLOAD_METADATA: &str = "upload_metadata";
pub const OP_CREATE_REQUEST: &str = "create_validation_request";
pub const OP_SUBMIT_RESPONSE: &str = "submit_validation_response";
pub const OP_GET_REQUEST: &str = "get_validation_request";

/// A failure to inject into the next call of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedFailure {
    Timeout(String),
    Transport(String),
    Reverted(String),
}

impl SimulatedFailure {
    fn into_error(self) -> CollaboratorError {
        match self {
            Self::Timeout(msg) => CollaboratorError::Timeout(msg),
            Self::Transport(msg) => CollaboratorError::Transport(msg),
            Self::Reverted(msg) => CollaboratorError::Reverted(msg),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    sequence: u64,
    next_agent_id: u64,
    agents: HashMap<u64, AgentInfo>,
    requests: HashMap<String, ValidationRequestInfo>,
    uploads: Vec<(String, serde_json::Value)>,
    #[serde(skip)]
    next_agent: Option<(u64, String)>,
    #[serde(skip)]
    failures: HashMap<String, VecDeque<SimulatedFailure>>,
    #[serde(skip)]
    calls: HashMap<String, usize>,
    #[serde(skip)]
    scan_cids: Option<Vec<String>>,
    #[serde(skip)]
    unmigratable: HashSet<String>,
}

impl Ledger {
    fn enter(&mut self, op: &str) -> CollaboratorResult<()> {
        *self.calls.entry(op.to_string()).or_default() += 1;
        match self.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    fn next_hash(&mut self) -> String {
        self.sequence += 1;
        format!("0x{:064x}", self.sequence)
    }
}

/// Deterministic in-memory chain, scanner and storage.
#[derive(Clone)]
pub struct SimulatedCollaborators {
    ledger: Arc<Mutex<Ledger>>,
    owner: String,
    ledger_path: Option<PathBuf>,
}

impl Default for SimulatedCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCollaborators {
    pub fn new() -> Self {
        Self::with_ledger(
            Ledger {
                next_agent_id: 1,
                ..Ledger::default()
            },
            None,
        )
    }

    /// A simulator whose ledger lives in `path`.
    ///
    /// An unreadable ledger file is replaced by an empty ledger.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ledger = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<Ledger>(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "discarding unreadable simulator ledger");
                Ledger::default()
            }),
            Err(_) => Ledger::default(),
        };
        Self::with_ledger(
            Ledger {
                next_agent_id: ledger.next_agent_id.max(1),
                ..ledger
            },
            Some(path),
        )
    }

    fn with_ledger(ledger: Ledger, ledger_path: Option<PathBuf>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            owner: "0x5a1e000000000000000000000000000000005a1e".to_string(),
            ledger_path,
        }
    }

    /// Write the ledger back to its file, if it has one.
    async fn persist(&self, ledger: &MutexGuard<'_, Ledger>) {
        let Some(path) = &self.ledger_path else {
            return;
        };
        let raw = match serde_json::to_string_pretty(&**ledger) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "failed to serialize simulator ledger");
                return;
            }
        };
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        if let Err(err) = tokio::fs::write(path, raw).await {
            warn!(path = %path.display(), error = %err, "failed to write simulator ledger");
        }
    }

    /// Address that owns everything this simulator registers.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Bundle this simulator behind every collaborator port.
    pub fn collaborators(&self) -> Collaborators {
        let shared = Arc::new(self.clone());
        Collaborators {
            agents: shared.clone(),
            scanner: shared.clone(),
            storage: shared.clone(),
            validations: shared.clone(),
            uploader: shared,
        }
    }

    /// Make the next call of `op` fail.
    pub async fn fail_next(&self, op: &str, failure: SimulatedFailure) {
        self.ledger
            .lock()
            .await
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(failure);
    }

    /// Fix the id and transaction of the next registration.
    pub async fn set_next_agent(&self, agent_id: u64, tx_hash: impl Into<String>) {
        self.ledger.lock().await.next_agent = Some((agent_id, tx_hash.into()));
    }

    /// Report exactly these CIDs from every scan.
    pub async fn set_scan_cids(&self, cids: Vec<String>) {
        self.ledger.lock().await.scan_cids = Some(cids);
    }

    /// Make migration of `cid` fail.
    pub async fn mark_unmigratable(&self, cid: impl Into<String>) {
        self.ledger.lock().await.unmigratable.insert(cid.into());
    }

    pub async fn call_count(&self, op: &str) -> usize {
        self.ledger.lock().await.calls.get(op).copied().unwrap_or(0)
    }

    /// Every document uploaded so far, with its name.
    pub async fn uploaded_documents(&self) -> Vec<(String, serde_json::Value)> {
        self.ledger.lock().await.uploads.clone()
    }

    fn token_cids(contract: &str, token_id: u64) -> Vec<String> {
        let tag: String = contract
            .trim_start_matches("0x")
            .chars()
            .take(8)
            .collect::<String>()
            .to_lowercase();
        // Images repeat every other token so the unique set is smaller.
        vec![
            format!("bafymeta{tag}{token_id:06}"),
            format!("bafyimg{tag}{:06}", token_id / 2),
        ]
    }
}

#[async_trait]
impl AgentRegistry for SimulatedCollaborators {
    async fn register_agent(&self, metadata_uri: &str) -> CollaboratorResult<AgentReceipt> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_REGISTER_AGENT)?;

        let (agent_id, tx_hash) = match ledger.next_agent.take() {
            Some(fixed) => fixed,
            None => {
                let id = ledger.next_agent_id;
                (id, ledger.next_hash())
            }
        };
        ledger.next_agent_id = ledger.next_agent_id.max(agent_id) + 1;
        ledger.agents.insert(
            agent_id,
            AgentInfo {
                owner: self.owner.clone(),
                metadata_uri: metadata_uri.to_string(),
                is_active: true,
            },
        );

        self.persist(&ledger).await;

        Ok(AgentReceipt {
            agent_id,
            tx_hash,
            owner: self.owner.clone(),
        })
    }

    async fn get_agent(&self, agent_id: u64) -> CollaboratorResult<AgentInfo> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_GET_AGENT)?;
        ledger
            .agents
            .get(&agent_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("agent {agent_id}")))
    }
}

#[async_trait]
impl NftScanner for SimulatedCollaborators {
    async fn scan(&self, contract: &str, range: TokenRange) -> CollaboratorResult<ScanOutcome> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_SCAN)?;

        let results: Vec<TokenScan> = (range.start..=range.end)
            .map(|token_id| TokenScan {
                token_id,
                token_uri: Some(format!("ipfs://bafymeta/{token_id}")),
                cids: Self::token_cids(contract, token_id),
                error: None,
            })
            .collect();

        let unique_cids = match &ledger.scan_cids {
            Some(fixed) => fixed.clone(),
            None => {
                let mut seen = HashSet::new();
                results
                    .iter()
                    .flat_map(|r| r.cids.iter())
                    .filter(|cid| seen.insert((*cid).clone()))
                    .cloned()
                    .collect()
            }
        };

        Ok(ScanOutcome {
            contract_info: ContractInfo {
                address: contract.to_string(),
                name: Some("Simulated Collection".to_string()),
                symbol: Some("SIM".to_string()),
                total_supply: Some(range.end + 1),
            },
            summary: ScanSummary {
                total: results.len() as u64,
                with_ipfs: results.len() as u64,
                failed: 0,
            },
            results,
            unique_cids,
        })
    }
}

#[async_trait]
impl StorageMigrator for SimulatedCollaborators {
    async fn batch_migrate(&self, cids: &[String]) -> CollaboratorResult<BatchMigration> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_BATCH_MIGRATE)?;

        let results: Vec<MigrationItem> = cids
            .iter()
            .enumerate()
            .map(|(i, cid)| {
                if ledger.unmigratable.contains(cid) {
                    MigrationItem {
                        source_cid: cid.clone(),
                        destination_id: None,
                        success: false,
                        error: Some("content not retrievable from IPFS".to_string()),
                        size_bytes: None,
                    }
                } else {
                    MigrationItem {
                        source_cid: cid.clone(),
                        destination_id: Some(format!("baga6ea4seaq{i:08}")),
                        success: true,
                        error: None,
                        size_bytes: Some(1024 * (i as u64 + 1)),
                    }
                }
            })
            .collect();

        Ok(BatchMigration {
            summary: MigrationSummary::from_items(&results),
            results,
        })
    }
}

#[async_trait]
impl MetadataUploader for SimulatedCollaborators {
    async fn upload_metadata(
        &self,
        document: &serde_json::Value,
        name: &str,
    ) -> CollaboratorResult<UploadedMetadata> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_UPLOAD_METADATA)?;

        ledger.uploads.push((name.to_string(), document.clone()));
        let n = ledger.uploads.len();
        self.persist(&ledger).await;
        Ok(UploadedMetadata {
            uri: format!("ipfs://bafkreisim{n:08}"),
            retrieval_url: Some(format!("https://storage.invalid/piece/{n}")),
        })
    }
}

#[async_trait]
impl ValidationRegistry for SimulatedCollaborators {
    async fn create_validation_request(
        &self,
        agent_id: u64,
        _task_uri: &str,
        validator: &str,
    ) -> CollaboratorResult<ValidationRequestReceipt> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_CREATE_REQUEST)?;

        if !ledger.agents.contains_key(&agent_id) {
            return Err(CollaboratorError::Reverted(format!("unknown agent {agent_id}")));
        }
        let request_hash = ledger.next_hash();
        let tx_hash = ledger.next_hash();
        ledger.requests.insert(
            request_hash.clone(),
            ValidationRequestInfo {
                status: "pending".to_string(),
                is_valid: false,
                proof_uri: None,
                requester: self.owner.clone(),
                validator: validator.to_string(),
            },
        );

        self.persist(&ledger).await;

        Ok(ValidationRequestReceipt {
            request_hash,
            tx_hash,
        })
    }

    async fn submit_validation_response(
        &self,
        request_hash: &str,
        approved: bool,
        proof_uri: &str,
    ) -> CollaboratorResult<ValidationResponseReceipt> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_SUBMIT_RESPONSE)?;

        let tx_hash = ledger.next_hash();
        let request = ledger
            .requests
            .get_mut(request_hash)
            .ok_or_else(|| CollaboratorError::Reverted(format!("unknown request {request_hash}")))?;
        request.status = if approved { "approved" } else { "rejected" }.to_string();
        request.is_valid = approved;
        request.proof_uri = Some(proof_uri.to_string());
        self.persist(&ledger).await;

        Ok(ValidationResponseReceipt { tx_hash })
    }

    async fn get_validation_request(
        &self,
        request_hash: &str,
    ) -> CollaboratorResult<ValidationRequestInfo> {
        let mut ledger = self.ledger.lock().await;
        ledger.enter(OP_GET_REQUEST)?;
        ledger
            .requests
            .get(request_hash)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("validation request {request_hash}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_deduplicates_cids() {
        let sim = SimulatedCollaborators::new();
        let outcome = sim
            .scan("0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D", TokenRange { start: 0, end: 3 })
            .await
            .unwrap();
        assert_eq!(outcome.summary.total, 4);
        // 4 metadata CIDs + 2 shared image CIDs
        assert_eq!(outcome.unique_cids.len(), 6);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let sim = SimulatedCollaborators::new();
        sim.fail_next(OP_SCAN, SimulatedFailure::Timeout("rpc".into())).await;

        let range = TokenRange { start: 0, end: 0 };
        let err = sim.scan("0x01", range).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout(_)));
        assert!(sim.scan("0x01", range).await.is_ok());
        assert_eq!(sim.call_count(OP_SCAN).await, 2);
    }

    #[tokio::test]
    async fn test_validation_lifecycle() {
        let sim = SimulatedCollaborators::new();
        sim.set_next_agent(42, "0xT1").await;
        let receipt = sim.register_agent("ipfs://agent").await.unwrap();
        assert_eq!(receipt.agent_id, 42);
        assert_eq!(receipt.tx_hash, "0xT1");

        let request = sim
            .create_validation_request(42, "ipfs://task", "0x00000000000000000000000000000000000000aa")
            .await
            .unwrap();
        assert_eq!(sim.get_validation_request(&request.request_hash).await.unwrap().status, "pending");

        sim.submit_validation_response(&request.request_hash, true, "ipfs://proof")
            .await
            .unwrap();
        let info = sim.get_validation_request(&request.request_hash).await.unwrap();
        assert_eq!(info.status, "approved");
        assert!(info.is_valid);
        assert_eq!(info.proof_uri.as_deref(), Some("ipfs://proof"));
    }

    #[tokio::test]
    async fn test_request_for_unknown_agent_reverts() {
        let sim = SimulatedCollaborators::new();
        let err = sim.create_validation_request(7, "ipfs://t", "0xv").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Reverted(_)));
    }

    #[tokio::test]
    async fn test_persistent_ledger_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulator.json");

        let first = SimulatedCollaborators::persistent(&path);
        let agent = first.register_agent("ipfs://agent").await.unwrap();
        let request = first
            .create_validation_request(agent.agent_id, "ipfs://task", "0xv")
            .await
            .unwrap();

        let second = SimulatedCollaborators::persistent(&path);
        assert!(second.get_agent(agent.agent_id).await.unwrap().is_active);
        assert_eq!(
            second.get_validation_request(&request.request_hash).await.unwrap().status,
            "pending"
        );
        let next = second.register_agent("ipfs://agent-2").await.unwrap();
        assert_eq!(next.agent_id, agent.agent_id + 1);
    }

    #[tokio::test]
    async fn test_unmigratable_cids_fail() {
        let sim = SimulatedCollaborators::new();
        sim.mark_unmigratable("cid2").await;
        let batch = sim
            .batch_migrate(&["cid1".to_string(), "cid2".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.summary.successful, 1);
        assert_eq!(batch.summary.failed, 1);
        assert!(!batch.results[1].success);
    }
}
