use serde::{Deserialize, Serialize};

use super::approval::ApprovalPolicy;
use super::workflow::WorkflowConfig;

/// Main configuration structure for nftmigrate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults applied when a workflow is started without explicit parameters
    #[serde(default)]
    pub workflow_defaults: WorkflowDefaults,

    /// Chains and storage network the pipeline talks to
    #[serde(default)]
    pub networks: NetworksConfig,

    /// Bridge service exposing the chain and storage collaborators
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Rule deciding the validation response when the operator does not
    #[serde(default)]
    pub approval: ApprovalPolicy,

    /// Largest token range a single scan may cover
    #[serde(default = "default_max_scan_span")]
    pub max_scan_span: u64,
}

const fn default_max_scan_span() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            workflow_defaults: WorkflowDefaults::default(),
            networks: NetworksConfig::default(),
            gateway: GatewayConfig::default(),
            approval: ApprovalPolicy::default(),
            max_scan_span: default_max_scan_span(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".nftmigrate/workflow.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Workflow parameters used when `start` omits them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowDefaults {
    /// NFT contract to scan
    #[serde(default)]
    pub nft_contract: String,

    /// First token id of the scan range
    #[serde(default = "default_start_token_id")]
    pub start_token_id: u64,

    /// Last token id of the scan range (inclusive)
    #[serde(default = "default_end_token_id")]
    pub end_token_id: u64,

    /// Validator asked to review the migration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_address: Option<String>,
}

const fn default_start_token_id() -> u64 {
    1
}

const fn default_end_token_id() -> u64 {
    10
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            nft_contract: String::new(),
            start_token_id: default_start_token_id(),
            end_token_id: default_end_token_id(),
            validator_address: None,
        }
    }
}

impl WorkflowDefaults {
    pub fn to_workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            nft_contract: self.nft_contract.clone(),
            start_token_id: self.start_token_id,
            end_token_id: self.end_token_id,
            validator_address: self.validator_address.clone(),
            extra: std::collections::BTreeMap::new(),
        }
    }
}

/// A single chain or storage network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Networks touched by a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NetworksConfig {
    /// Where the NFT contract lives
    #[serde(default = "default_nft_network")]
    pub nft: NetworkConfig,

    /// Where the ERC-8004 registries live
    #[serde(default = "default_validation_network")]
    pub validation: NetworkConfig,

    /// Filecoin network backing the storage collaborator
    #[serde(default = "default_filecoin_network")]
    pub filecoin: NetworkConfig,
}

fn default_nft_network() -> NetworkConfig {
    NetworkConfig {
        name: "Ethereum Mainnet".to_string(),
        chain_id: 1,
        rpc_url: "https://eth.llamarpc.com".to_string(),
    }
}

fn default_validation_network() -> NetworkConfig {
    NetworkConfig {
        name: "Sepolia Testnet".to_string(),
        chain_id: 11_155_111,
        rpc_url: "https://sepolia.gateway.tenderly.co".to_string(),
    }
}

fn default_filecoin_network() -> NetworkConfig {
    NetworkConfig {
        name: "Filecoin Calibration".to_string(),
        chain_id: 314_159,
        rpc_url: "https://api.calibration.node.glif.io/rpc/v1".to_string(),
    }
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            nft: default_nft_network(),
            validation: default_validation_network(),
            filecoin: default_filecoin_network(),
        }
    }
}

/// HTTP bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Base URL of the bridge service
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
