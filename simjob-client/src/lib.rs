//! SimJob HTTP Client
//!
//! A typed HTTP client for the per-entity operation surface of the SimJob
//! orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use simjob_client::OrchestratorClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OrchestratorClient::new("http://localhost:8080");
//!
//!     let record = client
//!         .create_record("coverage", "LEO sweep", Default::default())
//!         .await?;
//!     let job_id = client.run_job("coverage", record.id).await?;
//!
//!     println!("Started job: {}", job_id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod records;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use jobs::DownloadResult;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use simjob_core::domain::entity::Operation;
use simjob_core::dto::response::{ApiResponse, ResponseStatus};

/// HTTP client for the SimJob orchestrator API
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use simjob_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of an entity operation, e.g. `http://host/coverage/run`
    pub fn operation_url(&self, entity: &str, operation: Operation) -> String {
        format!("{}/{}/{}", self.base_url, entity, operation.path_segment())
    }

    /// Whether the orchestrator answers its health check
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    async fn post<B: Serialize>(
        &self,
        entity: &str,
        operation: Operation,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.operation_url(entity, operation);
        tracing::debug!("POST {}", url);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and unwrap the `data` of its envelope
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let envelope: ApiResponse<T> = self.handle_envelope(response).await?;
        envelope
            .data
            .ok_or_else(|| ClientError::ParseError("response envelope carries no data".to_string()))
    }

    /// Handle an API response whose envelope carries no data
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let _: ApiResponse<serde_json::Value> = self.handle_envelope(response).await?;
        Ok(())
    }

    async fn handle_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>> {
        let status = response.status();

        if !status.is_success() {
            return Err(self.error_from(response).await);
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

        if envelope.status != ResponseStatus::Success {
            return Err(ClientError::api_error(
                status.as_u16(),
                envelope.message.unwrap_or_default(),
            ));
        }
        Ok(envelope)
    }

    async fn error_from(&self, response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ClientError::api_error(status.as_u16(), envelope_message(status, &body))
    }
}

/// Message of an error envelope, falling back to the raw body
fn envelope_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        })
}
