//! SimJob orchestrator
//!
//! State store, job supervision and the per-entity HTTP surface.

pub mod api;
pub mod config;
pub mod registry;
pub mod repository;
pub mod service;

pub use config::OrchestratorConfig;
pub use service::{Orchestrator, Orchestrators, build_orchestrators};
