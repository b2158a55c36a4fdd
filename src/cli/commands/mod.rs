//! Command implementations and the wiring shared by all of them.

pub mod interactive;
pub mod lifecycle;
pub mod phase;
pub mod status;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::adapters::gateway::gateway_collaborators;
use crate::adapters::simulated::SimulatedCollaborators;
use crate::adapters::sqlite::{initialize_database, SqliteWorkflowStore};
use crate::cli::types::{Cli, Commands};
use crate::domain::models::Config;
use crate::services::{PhaseRegistry, PhaseSettings, WorkflowEngine, WorkflowStateService};

/// The engine every command drives.
pub type Engine = WorkflowEngine<SqliteWorkflowStore>;

/// Where `--simulate` keeps its ledger: next to the workflow database.
pub fn simulator_ledger_path(config: &Config) -> PathBuf {
    Path::new(&config.database.path).with_file_name("simulator.json")
}

/// Open the database and wire the engine to real or simulated collaborators.
pub async fn build_engine(config: &Config, simulate: bool) -> Result<Engine> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    let store = Arc::new(SqliteWorkflowStore::new(pool));

    let collaborators = if simulate {
        let ledger = simulator_ledger_path(config);
        debug!(ledger = %ledger.display(), "using simulated collaborators");
        SimulatedCollaborators::persistent(ledger).collaborators()
    } else {
        debug!(base_url = %config.gateway.base_url, "using gateway collaborators");
        gateway_collaborators(&config.gateway).context("Failed to create gateway client")?
    };

    let registry = PhaseRegistry::standard(&collaborators, &PhaseSettings::from(config));
    Ok(WorkflowEngine::new(
        WorkflowStateService::new(store),
        registry,
        config.workflow_defaults.to_workflow_config(),
    ))
}

/// Run the parsed command line.
pub async fn dispatch(cli: Cli, config: &Config) -> Result<ExitCode> {
    let engine = build_engine(config, cli.simulate).await?;
    let json = cli.json;

    match cli.command {
        Commands::Start(args) => lifecycle::start(&engine, args, json).await,
        Commands::Reset { yes } => lifecycle::reset(&engine, yes, json).await,
        Commands::Decide {
            action,
            decision,
            comment,
        } => lifecycle::decide(&engine, &action, &decision, &comment, json).await,
        Commands::Continue(options) => phase::continue_next(&engine, &options, json).await,
        Commands::Phase { number, options } => phase::run(&engine, number, &options, json).await,
        Commands::Jump { number, options } => phase::jump(&engine, number, &options, json).await,
        Commands::Retry(options) => phase::retry(&engine, &options, json).await,
        Commands::Status => status::status(&engine, json).await,
        Commands::Results { number } => status::results(&engine, number, json).await,
        Commands::Report => status::report(&engine, json).await,
        Commands::History => status::history(&engine, json).await,
        Commands::Phases => status::phases(&engine, json).await,
        Commands::Interactive => interactive::run(&engine).await,
    }
}
