//! Core domain types
//!
//! This module contains the domain structures shared across SimJob crates.
//! The orchestrator persists and mutates them, the runner reads parameters
//! from them and the CLI generates entity descriptors and registry entries.

pub mod entity;
pub mod job;
pub mod record;
pub mod registry;
