//! Repository Module
//!
//! Data access layer for the orchestrator.
//! The job store is the orchestrator's own state; the parameter store is the
//! collaborator contract of the metadata service that owns parameter records.

pub mod job;
pub mod record;

// Re-export for convenience
pub use job::JobStore;
pub use record::{InMemoryParameterStore, ParameterStore};
