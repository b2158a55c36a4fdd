//! Collaborator ports - the external systems the phases call.
//!
//! The workflow never talks to chains or storage directly. Each capability is
//! a narrow async trait; `adapters::gateway` implements them over HTTP and
//! `adapters::simulated` implements them in-process.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{
    ContractInfo, MigrationItem, MigrationSummary, ScanSummary, TokenRange, TokenScan,
};

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Network timeout: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Receipt of an agent registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReceipt {
    pub agent_id: u64,
    pub tx_hash: String,
    pub owner: String,
}

/// Registry view of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub owner: String,
    pub metadata_uri: String,
    pub is_active: bool,
}

/// Result of scanning a token range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub contract_info: ContractInfo,
    pub summary: ScanSummary,
    pub results: Vec<TokenScan>,
    pub unique_cids: Vec<String>,
}

/// Result of migrating a batch of CIDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMigration {
    pub summary: MigrationSummary,
    pub results: Vec<MigrationItem>,
}

/// Receipt of a validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequestReceipt {
    pub request_hash: String,
    pub tx_hash: String,
}

/// Receipt of a validation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponseReceipt {
    pub tx_hash: String,
}

/// Registry view of a validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequestInfo {
    pub status: String,
    pub is_valid: bool,
    #[serde(default)]
    pub proof_uri: Option<String>,
    pub requester: String,
    pub validator: String,
}

/// Location of a published metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMetadata {
    pub uri: String,
    #[serde(default)]
    pub retrieval_url: Option<String>,
}

/// ERC-8004 identity registry.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn register_agent(&self, metadata_uri: &str) -> CollaboratorResult<AgentReceipt>;

    async fn get_agent(&self, agent_id: u64) -> CollaboratorResult<AgentInfo>;
}

/// Reads token URIs of an NFT contract and extracts IPFS CIDs.
#[async_trait]
pub trait NftScanner: Send + Sync {
    async fn scan(&self, contract: &str, range: TokenRange) -> CollaboratorResult<ScanOutcome>;
}

/// Copies IPFS content into Filecoin-backed storage.
#[async_trait]
pub trait StorageMigrator: Send + Sync {
    async fn batch_migrate(&self, cids: &[String]) -> CollaboratorResult<BatchMigration>;
}

/// ERC-8004 validation registry.
#[async_trait]
pub trait ValidationRegistry: Send + Sync {
    async fn create_validation_request(
        &self,
        agent_id: u64,
        task_uri: &str,
        validator: &str,
    ) -> CollaboratorResult<ValidationRequestReceipt>;

    async fn submit_validation_response(
        &self,
        request_hash: &str,
        approved: bool,
        proof_uri: &str,
    ) -> CollaboratorResult<ValidationResponseReceipt>;

    async fn get_validation_request(
        &self,
        request_hash: &str,
    ) -> CollaboratorResult<ValidationRequestInfo>;
}

/// Publishes JSON documents and returns a content URI.
#[async_trait]
pub trait MetadataUploader: Send + Sync {
    async fn upload_metadata(
        &self,
        document: &serde_json::Value,
        name: &str,
    ) -> CollaboratorResult<UploadedMetadata>;
}

/// The full set of collaborators the standard phases need.
#[derive(Clone)]
pub struct Collaborators {
    pub agents: Arc<dyn AgentRegistry>,
    pub scanner: Arc<dyn NftScanner>,
    pub storage: Arc<dyn StorageMigrator>,
    pub validations: Arc<dyn ValidationRegistry>,
    pub uploader: Arc<dyn MetadataUploader>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
