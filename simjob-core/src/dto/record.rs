//! Parameter record DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::require_uuid;
use crate::error::SimJobError;

/// Body of `create_<T>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRecord {
    pub name: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Body of `delete_<T>_sim_job`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRef {
    pub record_id: Option<String>,
}

impl CreateRecord {
    pub fn name(&self) -> Result<&str, SimJobError> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SimJobError::Validation("missing required field 'name'".into()))
    }
}

impl RecordRef {
    pub fn new(record_id: Uuid) -> Self {
        Self {
            record_id: Some(record_id.to_string()),
        }
    }

    pub fn record_id(&self) -> Result<Uuid, SimJobError> {
        require_uuid("record_id", self.record_id.as_deref())
    }
}
