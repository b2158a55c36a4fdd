//! nftmigrate - phase-by-phase NFT IPFS to Filecoin migration
//!
//! Drives a seven-phase workflow: register an ERC-8004 agent, scan an NFT
//! collection for IPFS CIDs, open a validation request, migrate the content
//! to Filecoin-backed storage, publish a proof, submit the validation
//! response and produce a final report. Workflow state is persisted after
//! every transition so a run can be resumed, retried or inspected later.
//!
//! # Architecture
//!
//! - **Domain** (`domain`): workflow model, phase results, ports
//! - **Services** (`services`): state service, phase handlers, workflow engine
//! - **Adapters** (`adapters`): `SQLite` store, HTTP gateway, simulator
//! - **Infrastructure** (`infrastructure`): configuration and logging
//! - **CLI** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nftmigrate::adapters::simulated::SimulatedCollaborators;
//! use nftmigrate::adapters::sqlite::{create_migrated_test_pool, SqliteWorkflowStore};
//! use nftmigrate::services::{PhaseRegistry, PhaseSettings, WorkflowEngine, WorkflowStateService};
//!
//! let store = Arc::new(SqliteWorkflowStore::new(create_migrated_test_pool().await?));
//! let sim = SimulatedCollaborators::new();
//! let registry = PhaseRegistry::standard(&sim.collaborators(), &PhaseSettings::default());
//! let engine = WorkflowEngine::new(WorkflowStateService::new(store), registry, Default::default());
//! engine.start_new_workflow(Default::default()).await?;
//! let outcome = engine.continue_to_next_phase(Default::default()).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{Config, Phase, PhaseOutput, PhaseParams, PhaseStatus, Workflow};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{PhaseOutcome, StatusReport, WorkflowEngine};
