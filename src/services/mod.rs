pub mod phases;
pub mod state_service;
pub mod workflow_engine;

pub use phases::{PhaseHandler, PhaseRegistry, PhaseSettings};
pub use state_service::WorkflowStateService;
pub use workflow_engine::{NextAction, PhaseOutcome, StatusReport, WorkflowEngine};
