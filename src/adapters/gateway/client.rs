//! HTTP client for the chain and storage bridge.
//!
//! The bridge owns the ERC-8004 contracts, the NFT RPC node and the
//! Filecoin storage SDK. This client speaks plain JSON to it and implements
//! every collaborator port. Connect errors, 429 and 5xx responses are retried
//! with exponential backoff; everything else fails at once.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{
    CreateValidationRequest, ErrorBody, MigrateRequest, RegisterAgentRequest, ScanRequest,
    UploadMetadataRequest, ValidationResponseRequest,
};
use crate::domain::models::{GatewayConfig, TokenRange};
use crate::domain::ports::{
    AgentInfo, AgentReceipt, AgentRegistry, BatchMigration, CollaboratorError,
    CollaboratorResult, MetadataUploader, NftScanner, ScanOutcome, StorageMigrator,
    UploadedMetadata, ValidationRegistry, ValidationRequestInfo, ValidationRequestReceipt,
    ValidationResponseReceipt,
};

/// JSON client for the bridge service.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> CollaboratorResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| CollaboratorError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> CollaboratorResult<T> {
        let response = self.authorize(request).send().await.map_err(classify_transport)?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        Err(match (status, parsed) {
            (StatusCode::NOT_FOUND, Some(err)) => CollaboratorError::NotFound(err.error),
            (StatusCode::NOT_FOUND, None) => CollaboratorError::NotFound(body),
            (_, Some(err)) if err.reverted => CollaboratorError::Reverted(err.error),
            (_, Some(err)) => CollaboratorError::Remote {
                status: status.as_u16(),
                message: err.error,
            },
            (_, None) => CollaboratorError::Remote {
                status: status.as_u16(),
                message: body,
            },
        })
    }

    /// Send the request built by `build`, retrying transient failures.
    async fn execute<T, F>(&self, operation: &'static str, build: F) -> CollaboratorResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();
        let attempts = &AtomicU32::new(0);
        let build = &build;

        backoff::future::retry(policy, move || async move {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(operation, attempt, "gateway request");
            match self.send_once::<T>(build()).await {
                Ok(value) => Ok(value),
                Err(err) if is_transient(&err) && attempt <= self.max_retries => {
                    warn!(operation, attempt, error = %err, "transient gateway failure, retrying");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        })
        .await
    }
}

fn classify_transport(err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout(err.to_string())
    } else {
        CollaboratorError::Transport(err.to_string())
    }
}

/// Connect failures, rate limiting and server errors.
pub fn is_transient(err: &CollaboratorError) -> bool {
    match err {
        CollaboratorError::Transport(_) => true,
        CollaboratorError::Remote { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl AgentRegistry for GatewayClient {
    async fn register_agent(&self, metadata_uri: &str) -> CollaboratorResult<AgentReceipt> {
        let body = RegisterAgentRequest { metadata_uri };
        self.execute("register_agent", || self.http.post(self.url("/agents")).json(&body))
            .await
    }

    async fn get_agent(&self, agent_id: u64) -> CollaboratorResult<AgentInfo> {
        let url = self.url(&format!("/agents/{agent_id}"));
        self.execute("get_agent", || self.http.get(&url)).await
    }
}

#[async_trait]
impl NftScanner for GatewayClient {
    async fn scan(&self, contract: &str, range: TokenRange) -> CollaboratorResult<ScanOutcome> {
        let body = ScanRequest {
            contract,
            start_token_id: range.start,
            end_token_id: range.end,
        };
        self.execute("scan", || self.http.post(self.url("/nft/scan")).json(&body))
            .await
    }
}

#[async_trait]
impl StorageMigrator for GatewayClient {
    async fn batch_migrate(&self, cids: &[String]) -> CollaboratorResult<BatchMigration> {
        let body = MigrateRequest { cids };
        self.execute("batch_migrate", || {
            self.http.post(self.url("/storage/migrate")).json(&body)
        })
        .await
    }
}

#[async_trait]
impl MetadataUploader for GatewayClient {
    async fn upload_metadata(
        &self,
        document: &serde_json::Value,
        name: &str,
    ) -> CollaboratorResult<UploadedMetadata> {
        let body = UploadMetadataRequest { name, document };
        self.execute("upload_metadata", || {
            self.http.post(self.url("/storage/metadata")).json(&body)
        })
        .await
    }
}

#[async_trait]
impl ValidationRegistry for GatewayClient {
    async fn create_validation_request(
        &self,
        agent_id: u64,
        task_uri: &str,
        validator: &str,
    ) -> CollaboratorResult<ValidationRequestReceipt> {
        let body = CreateValidationRequest {
            agent_id,
            task_uri,
            validator,
        };
        self.execute("create_validation_request", || {
            self.http.post(self.url("/validations")).json(&body)
        })
        .await
    }

    async fn submit_validation_response(
        &self,
        request_hash: &str,
        approved: bool,
        proof_uri: &str,
    ) -> CollaboratorResult<ValidationResponseReceipt> {
        let url = self.url(&format!("/validations/{request_hash}/response"));
        let body = ValidationResponseRequest {
            approved,
            proof_uri,
        };
        self.execute("submit_validation_response", || {
            self.http.post(&url).json(&body)
        })
        .await
    }

    async fn get_validation_request(
        &self,
        request_hash: &str,
    ) -> CollaboratorResult<ValidationRequestInfo> {
        let url = self.url(&format!("/validations/{request_hash}"));
        self.execute("get_validation_request", || self.http.get(&url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&CollaboratorError::Transport("refused".into())));
        assert!(is_transient(&CollaboratorError::Remote {
            status: 429,
            message: String::new()
        }));
        assert!(is_transient(&CollaboratorError::Remote {
            status: 503,
            message: String::new()
        }));
        assert!(!is_transient(&CollaboratorError::Remote {
            status: 400,
            message: String::new()
        }));
        assert!(!is_transient(&CollaboratorError::Timeout("slow".into())));
        assert!(!is_transient(&CollaboratorError::Reverted("nope".into())));
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let client = GatewayClient::new(&GatewayConfig {
            base_url: "http://bridge.local/".into(),
            api_token: Some(String::new()),
            ..GatewayConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("/agents"), "http://bridge.local/agents");
        assert!(client.api_token.is_none());
    }
}
