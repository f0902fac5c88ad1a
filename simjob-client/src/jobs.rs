//! Job-related API endpoints

use crate::OrchestratorClient;
use crate::error::{ClientError, Result};
use reqwest::StatusCode;
use simjob_core::domain::entity::Operation;
use simjob_core::domain::job::JobSnapshot;
use simjob_core::dto::job::{JobRef, RunAccepted, RunJob};
use simjob_core::dto::response::ApiResponse;
use uuid::Uuid;

/// Outcome of a report download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    /// The PDF report
    Report(Vec<u8>),
    /// The job is still running; carries the orchestrator's message
    Pending(String),
}

impl OrchestratorClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Start a simulation job for a record
    ///
    /// # Returns
    /// The id of the new job. A 400 means a job is already running for the
    /// record.
    pub async fn run_job(&self, entity: &str, record_id: Uuid) -> Result<Uuid> {
        let response = self
            .post(entity, Operation::Run, &RunJob::new(record_id))
            .await?;

        let accepted: RunAccepted = self.handle_response(response).await?;
        Ok(accepted.job_id)
    }

    /// Get the current state of a job
    pub async fn poll_job(&self, entity: &str, job_id: Uuid) -> Result<JobSnapshot> {
        let response = self
            .post(entity, Operation::Poll, &JobRef::new(job_id))
            .await?;

        self.handle_response(response).await
    }

    /// Download the rendered report of a job
    pub async fn download_result(&self, entity: &str, job_id: Uuid) -> Result<DownloadResult> {
        let response = self
            .post(entity, Operation::Download, &JobRef::new(job_id))
            .await?;

        match response.status() {
            StatusCode::OK => Ok(DownloadResult::Report(response.bytes().await?.to_vec())),
            StatusCode::ACCEPTED => {
                let envelope: ApiResponse<serde_json::Value> = response.json().await.map_err(|e| {
                    ClientError::ParseError(format!("Failed to parse JSON response: {}", e))
                })?;
                Ok(DownloadResult::Pending(envelope.message.unwrap_or_default()))
            }
            _ => Err(self.error_from(response).await),
        }
    }

    /// Delete a job's result directory and report
    ///
    /// Deleting an already deleted job succeeds.
    pub async fn delete_result(&self, entity: &str, job_id: Uuid) -> Result<JobSnapshot> {
        let response = self
            .post(entity, Operation::DeleteResult, &JobRef::new(job_id))
            .await?;

        self.handle_response(response).await
    }
}
