//! Service Module
//!
//! Business logic layer for the orchestrator.
//! The per-entity orchestrators drive the job store and hand runs to the
//! shared supervisor.

pub mod simjob;
pub mod supervisor;

use simjob_runner::Simulator;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::registry::LoadedEntity;
use crate::repository::{JobStore, ParameterStore};

// Re-export for convenience
pub use simjob::{Download, Orchestrator};
pub use supervisor::Supervisor;

/// Orchestrators of every loaded entity type, keyed by entity key
pub type Orchestrators = BTreeMap<String, Arc<Orchestrator>>;

/// Builds one orchestrator per entity, sharing the job store and worker pool
pub fn build_orchestrators(
    config: &OrchestratorConfig,
    entities: Vec<LoadedEntity>,
    records: Arc<dyn ParameterStore>,
    simulator: Arc<dyn Simulator>,
) -> Orchestrators {
    let jobs = Arc::new(JobStore::new());
    let supervisor = Supervisor::new(
        simulator,
        config.runner.max_parallel_jobs,
        config.runner.output_wait,
    );

    entities
        .into_iter()
        .map(|entity| {
            let orchestrator = Orchestrator::new(
                entity,
                config,
                jobs.clone(),
                records.clone(),
                supervisor.clone(),
            );
            (orchestrator.key().to_string(), Arc::new(orchestrator))
        })
        .collect()
}
