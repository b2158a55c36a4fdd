pub mod approval;
pub mod config;
pub mod phase_output;
pub mod workflow;

pub use approval::ApprovalPolicy;
pub use config::{
    Config, DatabaseConfig, GatewayConfig, LoggingConfig, NetworkConfig, NetworksConfig,
    WorkflowDefaults,
};
pub use phase_output::{
    AgentMetadata, AgentRegistration, AgentSection, ContractInfo, DecisionSource, FinalReport,
    MigrationItem, MigrationReport, MigrationSummary, NetworkNames, NftScanReport, NftScanSection,
    NftTarget, PhaseOutput, PriorResults, ProofMetadata, ProofRecord, ScanSummary, TaskMetadata,
    TokenRange, TokenScan, ValidationRequestRecord, ValidationResponseRecord, ValidationSection,
};
pub use workflow::{
    ErrorEntry, NewWorkflow, Phase, PhaseFailure, PhaseParams, PhaseRecord, PhaseStatus,
    UserAction, Workflow, WorkflowConfig, WorkflowStatus, TOTAL_PHASES,
};
