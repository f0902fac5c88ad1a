//! SimJob domain types
//!
//! A [`SimJob`] is one tracked execution attempt of the external simulator
//! against a parameter record. Its lifecycle is
//! `created -> running -> {succeeded, failed}`, and any of those can move to
//! `deleted`, which is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ErrorKind, SimJobError};

/// Simulation job record
///
/// Mutated only by the background supervisor (status, timestamps, results,
/// error info) and by explicit deletion. Reads never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimJob {
    pub job_id: Uuid,
    /// Key of the entity type this job belongs to (e.g. `coverage`)
    pub entity: String,
    /// Parameter record this job runs against; immutable after creation
    pub parent_ref: Uuid,
    pub status: JobStatus,
    /// Directory reserved for this job's raw output
    pub result_dir: PathBuf,
    /// Rendered report, present only while `succeeded`
    pub report_path: Option<PathBuf>,
    /// Failure reason, present only once `failed`
    pub error_info: Option<ErrorInfo>,
    /// Ingested `key -> value` mapping of the raw output
    pub results: Option<BTreeMap<String, f64>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Running,
    Succeeded,
    Failed,
    Deleted,
}

/// Structured failure reason recorded on a failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// Human-readable reason, always present
    pub message: String,
    /// Captured process diagnostics (tail of stderr), when available
    pub diagnostic: Option<String>,
}

/// Point-in-time view of a job returned by polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub entity: String,
    pub parent_ref: Uuid,
    pub status: JobStatus,
    pub report_path: Option<PathBuf>,
    pub error: Option<ErrorInfo>,
    pub results: Option<BTreeMap<String, f64>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `running` for longer than the configured liveness threshold.
    /// Callers should treat such a job as failed.
    pub stale: bool,
}

impl JobStatus {
    /// Whether no further supervisor transition can happen
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Deleted)
    }

    /// Allowed transitions of the job state machine
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Created, Running) => true,
            (Running, Succeeded) | (Running, Failed) => true,
            (Deleted, _) => false,
            (_, Deleted) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        if !diagnostic.trim().is_empty() {
            self.diagnostic = Some(diagnostic);
        }
        self
    }
}

impl From<&SimJobError> for ErrorInfo {
    fn from(err: &SimJobError) -> Self {
        ErrorInfo::new(err.kind(), err.to_string())
    }
}

impl SimJob {
    /// Creates a job in `created` state
    pub fn new(entity: impl Into<String>, parent_ref: Uuid, result_dir: PathBuf) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            entity: entity.into(),
            parent_ref,
            status: JobStatus::Created,
            result_dir,
            report_path: None,
            error_info: None,
            results: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), SimJobError> {
        if !self.status.can_transition_to(next) {
            return Err(SimJobError::Conflict(format!(
                "Job {} cannot move from {} to {}",
                self.job_id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<(), SimJobError> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_succeeded(
        &mut self,
        report_path: PathBuf,
        results: BTreeMap<String, f64>,
    ) -> Result<(), SimJobError> {
        self.transition(JobStatus::Succeeded)?;
        self.report_path = Some(report_path);
        self.results = Some(results);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: ErrorInfo) -> Result<(), SimJobError> {
        self.transition(JobStatus::Failed)?;
        self.error_info = Some(error);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Moves the job to `deleted`. Deleting a deleted job is a no-op.
    ///
    /// Returns the report path that was detached, if any.
    pub fn mark_deleted(&mut self) -> Option<PathBuf> {
        if self.status == JobStatus::Deleted {
            return None;
        }
        self.status = JobStatus::Deleted;
        self.results = None;
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
        self.report_path.take()
    }

    /// Whether the job has been `running` for longer than `threshold`
    pub fn is_stale(&self, threshold: chrono::Duration, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        let since = self.started_at.unwrap_or(self.created_at);
        now.signed_duration_since(since) > threshold
    }

    pub fn snapshot(&self, stale: bool) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id,
            entity: self.entity.clone(),
            parent_ref: self.parent_ref,
            status: self.status,
            report_path: self.report_path.clone(),
            error: self.error_info.clone(),
            results: self.results.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> SimJob {
        SimJob::new("coverage", Uuid::new_v4(), PathBuf::from("/tmp/job"))
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut job = job();
        assert_eq!(job.status, JobStatus::Created);
        job.mark_running().unwrap();
        job.mark_succeeded(PathBuf::from("/tmp/report.pdf"), BTreeMap::new())
            .unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.report_path.is_some());
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_cannot_skip_running() {
        let mut job = job();
        let err = job
            .mark_failed(ErrorInfo::new(ErrorKind::ExternalProcess, "exit 1"))
            .unwrap_err();
        assert!(matches!(err, SimJobError::Conflict(_)));
        assert_eq!(job.status, JobStatus::Created);
    }

    #[test]
    fn test_no_transition_out_of_deleted() {
        for next in [
            JobStatus::Created,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
            JobStatus::Deleted,
        ] {
            assert!(!JobStatus::Deleted.can_transition_to(next));
        }
    }

    #[test]
    fn test_any_live_state_can_be_deleted() {
        for from in [
            JobStatus::Created,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
        ] {
            assert!(from.can_transition_to(JobStatus::Deleted));
        }
    }

    #[test]
    fn test_mark_deleted_detaches_report_once() {
        let mut job = job();
        job.mark_running().unwrap();
        job.mark_succeeded(PathBuf::from("/tmp/r.pdf"), BTreeMap::new())
            .unwrap();

        assert_eq!(job.mark_deleted(), Some(PathBuf::from("/tmp/r.pdf")));
        assert_eq!(job.status, JobStatus::Deleted);
        assert!(job.report_path.is_none());
        assert_eq!(job.mark_deleted(), None);
    }

    #[test]
    fn test_stale_only_applies_to_running() {
        let mut job = job();
        let later = Utc::now() + chrono::Duration::hours(1);
        assert!(!job.is_stale(chrono::Duration::minutes(1), later));
        job.mark_running().unwrap();
        assert!(job.is_stale(chrono::Duration::minutes(1), later));
        assert!(!job.is_stale(chrono::Duration::hours(2), later));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Succeeded).unwrap();
        assert_eq!(json, "\"succeeded\"");
    }

    #[test]
    fn test_error_info_ignores_blank_diagnostic() {
        let info = ErrorInfo::new(ErrorKind::ExternalProcess, "exit 2").with_diagnostic("  \n");
        assert!(info.diagnostic.is_none());
    }
}
