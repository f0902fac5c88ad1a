//! Parameter Record Repository
//!
//! The orchestration layer only reads parameter records and flips their
//! coarse status flag. [`ParameterStore`] is that contract; the in-memory
//! implementation backs the `create_<T>` operation and the tests.

use chrono::Utc;
use dashmap::DashMap;
use simjob_core::SimJobError;
use simjob_core::domain::record::{ParameterRecord, RecordStatus};
use uuid::Uuid;

/// Access to parameter records owned by the metadata service
pub trait ParameterStore: Send + Sync {
    fn get(&self, id: Uuid) -> Option<ParameterRecord>;

    fn set_status(&self, id: Uuid, status: RecordStatus) -> Result<(), SimJobError>;

    fn create(&self, record: ParameterRecord) -> Result<ParameterRecord, SimJobError>;

    /// Returns whether a record was removed
    fn delete(&self, id: Uuid) -> bool;
}

#[derive(Default)]
pub struct InMemoryParameterStore {
    records: DashMap<Uuid, ParameterRecord>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn get(&self, id: Uuid) -> Option<ParameterRecord> {
        self.records.get(&id).map(|r| r.clone())
    }

    fn set_status(&self, id: Uuid, status: RecordStatus) -> Result<(), SimJobError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| SimJobError::NotFound(format!("Record {} not found", id)))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    fn create(&self, record: ParameterRecord) -> Result<ParameterRecord, SimJobError> {
        if self.records.contains_key(&record.id) {
            return Err(SimJobError::Conflict(format!(
                "Record {} already exists",
                record.id
            )));
        }
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn delete(&self, id: Uuid) -> bool {
        self.records.remove(&id).is_some()
    }
}
