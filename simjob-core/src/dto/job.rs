//! Job DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_uuid;
use crate::error::SimJobError;

/// Body of `run_<T>_sim_job`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunJob {
    pub record_id: Option<String>,
}

/// Body of the poll, download and delete-result operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRef {
    pub job_id: Option<String>,
}

/// Payload returned when a run is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAccepted {
    pub job_id: Uuid,
}

impl RunJob {
    pub fn new(record_id: Uuid) -> Self {
        Self {
            record_id: Some(record_id.to_string()),
        }
    }

    pub fn record_id(&self) -> Result<Uuid, SimJobError> {
        require_uuid("record_id", self.record_id.as_deref())
    }
}

impl JobRef {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
        }
    }

    pub fn job_id(&self) -> Result<Uuid, SimJobError> {
        require_uuid("job_id", self.job_id.as_deref())
    }
}
