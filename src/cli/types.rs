//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::models::{NewWorkflow, PhaseParams};

#[derive(Parser, Debug)]
#[command(name = "nftmigrate")]
#[command(
    about = "Phase-by-phase NFT IPFS to Filecoin migration with ERC-8004 validation",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra YAML config file merged over .nftmigrate/config.yaml
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use the offline simulator instead of the bridge service
    #[arg(long, global = true)]
    pub simulate: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new migration workflow
    Start(StartArgs),

    /// Show the active workflow and its phases
    Status,

    /// Run the next phase
    Continue(PhaseOptions),

    /// Run a specific phase (1-7)
    Phase {
        /// Phase number
        number: u8,

        #[command(flatten)]
        options: PhaseOptions,
    },

    /// Run any phase up to the first incomplete one
    Jump {
        /// Phase number
        number: u8,

        #[command(flatten)]
        options: PhaseOptions,
    },

    /// Retry the failed or interrupted phase
    Retry(PhaseOptions),

    /// Show stored phase results
    Results {
        /// Only this phase
        number: Option<u8>,
    },

    /// Show the final report of a completed workflow
    Report,

    /// Show saved snapshots of the active workflow and archived workflows
    History,

    /// List the seven phases
    Phases,

    /// Record an operator decision in the audit trail
    Decide {
        /// What was decided on, e.g. "approve_migration"
        action: String,

        /// The decision, e.g. "yes"
        decision: String,

        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Archive the active workflow and clear it
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Step through the workflow with prompts
    Interactive,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// NFT contract to scan
    #[arg(long, value_name = "ADDRESS")]
    pub nft_contract: Option<String>,

    /// First token id to scan
    #[arg(long)]
    pub start_token_id: Option<u64>,

    /// Last token id to scan (inclusive)
    #[arg(long)]
    pub end_token_id: Option<u64>,

    /// Validator asked to review the migration
    #[arg(long, value_name = "ADDRESS")]
    pub validator: Option<String>,
}

impl From<StartArgs> for NewWorkflow {
    fn from(args: StartArgs) -> Self {
        Self {
            nft_contract: args.nft_contract,
            start_token_id: args.start_token_id,
            end_token_id: args.end_token_id,
            validator_address: args.validator,
            extra: Default::default(),
        }
    }
}

/// Per-run overrides accepted by every phase-executing command
#[derive(Args, Debug, Clone, Default)]
pub struct PhaseOptions {
    /// Override the NFT contract for this run
    #[arg(long, value_name = "ADDRESS")]
    pub nft_contract: Option<String>,

    #[arg(long)]
    pub start_token_id: Option<u64>,

    #[arg(long)]
    pub end_token_id: Option<u64>,

    /// Override the validator for this run
    #[arg(long, value_name = "ADDRESS")]
    pub validator: Option<String>,

    /// Approve the migration in phase 6 regardless of policy
    #[arg(long, conflicts_with = "reject")]
    pub approve: bool,

    /// Reject the migration in phase 6 regardless of policy
    #[arg(long)]
    pub reject: bool,
}

impl PhaseOptions {
    pub fn to_params(&self) -> PhaseParams {
        let approved = match (self.approve, self.reject) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        PhaseParams {
            nft_contract: self.nft_contract.clone(),
            start_token_id: self.start_token_id,
            end_token_id: self.end_token_id,
            validator_address: self.validator.clone(),
            approved,
            ..PhaseParams::default()
        }
    }
}
