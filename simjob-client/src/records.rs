//! Parameter record endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use serde_json::{Map, Value};
use simjob_core::domain::entity::Operation;
use simjob_core::domain::record::ParameterRecord;
use simjob_core::dto::record::{CreateRecord, RecordRef};
use uuid::Uuid;

impl OrchestratorClient {
    /// Create a parameter record for an entity type
    ///
    /// # Arguments
    /// * `entity` - Entity key, e.g. `coverage`
    /// * `name` - Display name of the record
    /// * `params` - The configuration blob
    pub async fn create_record(
        &self,
        entity: &str,
        name: &str,
        params: Map<String, Value>,
    ) -> Result<ParameterRecord> {
        let req = CreateRecord {
            name: Some(name.to_string()),
            params,
        };
        let response = self.post(entity, Operation::Create, &req).await?;

        self.handle_response(response).await
    }

    /// Delete a parameter record and all its jobs
    ///
    /// Fails with a 400 while a job of the record is running.
    pub async fn delete_record(&self, entity: &str, record_id: Uuid) -> Result<()> {
        let response = self
            .post(entity, Operation::DeleteJob, &RecordRef::new(record_id))
            .await?;

        self.handle_empty_response(response).await
    }
}
