//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - WorkflowStore: durable workflow state
//! - AgentRegistry, NftScanner, StorageMigrator, ValidationRegistry,
//!   MetadataUploader: the external collaborators the phases call

pub mod collaborators;
pub mod workflow_store;

pub use collaborators::{
    AgentInfo, AgentReceipt, AgentRegistry, BatchMigration, CollaboratorError,
    CollaboratorResult, Collaborators, MetadataUploader, NftScanner, ScanOutcome,
    StorageMigrator, UploadedMetadata, ValidationRegistry, ValidationRequestInfo,
    ValidationRequestReceipt, ValidationResponseReceipt,
};
pub use workflow_store::{ArchivedWorkflow, StoredPhaseOutput, WorkflowSnapshot, WorkflowStore};
