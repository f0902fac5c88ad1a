//! Parameter record domain types
//!
//! Parameter records are owned by the metadata service. The orchestration
//! layer reads their parameters and flips their coarse status flag; it never
//! rewrites parameter content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// User-authored configuration for one simulation scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub id: Uuid,
    /// Entity key the record belongs to (e.g. `beam_hopping`)
    pub entity: String,
    pub name: String,
    pub params: Map<String, Value>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Coarse processing flag of a parameter record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Idle,
    Processing,
    Completed,
    Failed,
}

impl ParameterRecord {
    pub fn new(entity: impl Into<String>, name: impl Into<String>, params: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity: entity.into(),
            name: name.into(),
            params,
            status: RecordStatus::Idle,
            created_at: now,
            updated_at: now,
        }
    }
}
