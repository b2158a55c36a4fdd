use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{ApprovalPolicy, Config};
use crate::services::phases::is_valid_address;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid gateway timeout: {0}. Must be at least 1 second")]
    InvalidTimeout(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid max_scan_span: {0}. Must be at least 1")]
    InvalidScanSpan(u64),

    #[error("Invalid approval percent: {0}. Must be between 0 and 100")]
    InvalidApprovalPercent(f64),

    #[error("Invalid default {field}: '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid default token range: start ({0}) is after end ({1})")]
    InvalidTokenRange(u64, u64),
}

/// Pre-`NFTMIGRATE_` variable names and the keys they set.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("NFT_CONTRACT_ADDRESS", "workflow_defaults.nft_contract"),
    ("NFT_START_TOKEN_ID", "workflow_defaults.start_token_id"),
    ("NFT_END_TOKEN_ID", "workflow_defaults.end_token_id"),
    ("VALIDATOR_ADDRESS", "workflow_defaults.validator_address"),
    ("NFT_NETWORK_NAME", "networks.nft.name"),
    ("NFT_NETWORK_CHAIN_ID", "networks.nft.chain_id"),
    ("NFT_NETWORK_RPC_URL", "networks.nft.rpc_url"),
    ("VALIDATION_NETWORK_NAME", "networks.validation.name"),
    ("VALIDATION_NETWORK_CHAIN_ID", "networks.validation.chain_id"),
    ("VALIDATION_NETWORK_RPC_URL", "networks.validation.rpc_url"),
    ("FILECOIN_NETWORK_NAME", "networks.filecoin.name"),
    ("FILECOIN_NETWORK_CHAIN_ID", "networks.filecoin.chain_id"),
    ("FILECOIN_NETWORK_RPC_URL", "networks.filecoin.rpc_url"),
];

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
    })
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .nftmigrate/config.yaml
    /// 3. .nftmigrate/local.yaml
    /// 4. `override_path`, when given
    /// 5. Legacy variables (`NFT_CONTRACT_ADDRESS`, `VALIDATOR_ADDRESS`, ...)
    /// 6. `NFTMIGRATE_*` variables, `__` separating nested keys
    pub fn load(override_path: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".nftmigrate/config.yaml"))
            .merge(Yaml::file(".nftmigrate/local.yaml"));

        if let Some(path) = override_path {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(legacy_env())
            .merge(Env::prefixed("NFTMIGRATE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        let gateway = &config.gateway;
        if gateway.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(gateway.timeout_secs));
        }
        if gateway.initial_backoff_ms >= gateway.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                gateway.initial_backoff_ms,
                gateway.max_backoff_ms,
            ));
        }

        if config.max_scan_span == 0 {
            return Err(ConfigError::InvalidScanSpan(config.max_scan_span));
        }
        if let ApprovalPolicy::MinSuccessRate { percent } = config.approval {
            if !(0.0..=100.0).contains(&percent) {
                return Err(ConfigError::InvalidApprovalPercent(percent));
            }
        }

        let defaults = &config.workflow_defaults;
        // An empty contract just means `start` must be given one.
        if !defaults.nft_contract.is_empty() && !is_valid_address(&defaults.nft_contract) {
            return Err(ConfigError::InvalidAddress {
                field: "nft_contract",
                value: defaults.nft_contract.clone(),
            });
        }
        if let Some(validator) = &defaults.validator_address {
            if !is_valid_address(validator) {
                return Err(ConfigError::InvalidAddress {
                    field: "validator_address",
                    value: validator.clone(),
                });
            }
        }
        if defaults.start_token_id > defaults.end_token_id {
            return Err(ConfigError::InvalidTokenRange(
                defaults.start_token_id,
                defaults.end_token_id,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONTRACT: &str = "0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D";
    const VALIDATOR: &str = "0x00000000000000000000000000000000000000aa";

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".nftmigrate/workflow.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.workflow_defaults.start_token_id, 1);
        assert_eq!(config.workflow_defaults.end_token_id, 10);
        assert_eq!(config.networks.validation.chain_id, 11_155_111);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/path.db
  max_connections: 2
logging:
  level: debug
  format: json
workflow_defaults:
  nft_contract: '0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D'
  start_token_id: 0
  end_token_id: 99
approval:
  rule: min_success_rate
  percent: 90.0
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.workflow_defaults.end_token_id, 99);
        assert_eq!(config.approval, ApprovalPolicy::MinSuccessRate { percent: 90.0 });
        assert_eq!(config.max_scan_span, 10_000);
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format_and_rotation() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_validate_database() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));

        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConnections(0))
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.gateway.initial_backoff_ms = 30_000;
        config.gateway.max_backoff_ms = 10_000;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        ));
    }

    #[test]
    fn test_validate_defaults() {
        let mut config = Config::default();
        config.workflow_defaults.nft_contract = "0x123".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidAddress { field: "nft_contract", .. })
        ));

        let mut config = Config::default();
        config.workflow_defaults.validator_address = Some("nope".to_string());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidAddress { field: "validator_address", .. })
        ));

        let mut config = Config::default();
        config.workflow_defaults.start_token_id = 11;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTokenRange(11, 10))
        ));

        let mut config = Config::default();
        config.approval = ApprovalPolicy::MinSuccessRate { percent: 120.0 };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidApprovalPercent(_))
        ));
    }

    #[test]
    fn test_legacy_and_prefixed_env() {
        temp_env::with_vars(
            [
                ("NFT_CONTRACT_ADDRESS", Some(CONTRACT)),
                ("NFT_END_TOKEN_ID", Some("25")),
                ("VALIDATOR_ADDRESS", Some(VALIDATOR)),
                ("FILECOIN_NETWORK_NAME", Some("Filecoin Mainnet")),
                ("NFTMIGRATE_WORKFLOW_DEFAULTS__END_TOKEN_ID", Some("30")),
                ("NFTMIGRATE_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load(None).expect("config should load");
                assert_eq!(config.workflow_defaults.nft_contract, CONTRACT);
                assert_eq!(config.workflow_defaults.validator_address.as_deref(), Some(VALIDATOR));
                assert_eq!(config.networks.filecoin.name, "Filecoin Mainnet");
                assert_eq!(config.networks.filecoin.chain_id, 314_159);
                // Prefixed variables beat the legacy names.
                assert_eq!(config.workflow_defaults.end_token_id, 30);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_scan_span: 50\ngateway:\n  base_url: http://bridge:9000").unwrap();
        file.flush().unwrap();

        temp_env::with_var("NFTMIGRATE_MAX_SCAN_SPAN", None::<&str>, || {
            let config = ConfigLoader::load(Some(file.path())).unwrap();
            assert_eq!(config.max_scan_span, 50);
            assert_eq!(config.gateway.base_url, "http://bridge:9000");
            assert_eq!(config.gateway.max_retries, 3);
        });
    }

    #[test]
    fn test_missing_override_file_is_an_error() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/nftmigrate.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: loud").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
