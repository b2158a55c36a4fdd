//! Collaborators backed by the HTTP bridge service.

pub mod client;
pub mod models;

use std::sync::Arc;

pub use client::{is_transient, GatewayClient};

use crate::domain::models::GatewayConfig;
use crate::domain::ports::{CollaboratorResult, Collaborators};

/// Build every collaborator port on one shared client.
pub fn gateway_collaborators(config: &GatewayConfig) -> CollaboratorResult<Collaborators> {
    let client = Arc::new(GatewayClient::new(config)?);
    Ok(Collaborators {
        agents: client.clone(),
        scanner: client.clone(),
        storage: client.clone(),
        validations: client.clone(),
        uploader: client,
    })
}
