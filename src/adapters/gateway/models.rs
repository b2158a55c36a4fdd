//! Request bodies for the bridge service.
//!
//! Responses deserialize straight into the port types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct RegisterAgentRequest<'a> {
    pub metadata_uri: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ScanRequest<'a> {
    pub contract: &'a str,
    pub start_token_id: u64,
    pub end_token_id: u64,
}

#[derive(Debug, Serialize)]
pub struct MigrateRequest<'a> {
    pub cids: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct UploadMetadataRequest<'a> {
    pub name: &'a str,
    pub document: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CreateValidationRequest<'a> {
    pub agent_id: u64,
    pub task_uri: &'a str,
    pub validator: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponseRequest<'a> {
    pub approved: bool,
    pub proof_uri: &'a str,
}

/// Error body returned by the bridge on failure.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Set when an on-chain transaction reverted.
    #[serde(default)]
    pub reverted: bool,
}
