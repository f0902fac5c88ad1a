//! SimJob Runner
//!
//! Execution side of the orchestration layer.
//!
//! Architecture:
//! - Configuration: Simulator command, timeouts and pool size from environment
//! - Process: Launching and supervising the external simulator
//! - Ingest: Projecting the simulator's raw output into a keyed mapping
//! - Report: Rendering the parameter table and result plot into a PDF
//!
//! The orchestrator owns job state; this crate only performs the work and
//! reports outcomes as `Result`s.

pub mod config;
pub mod ingest;
pub mod process;
pub mod report;

pub use config::RunnerConfig;
pub use ingest::{Ingestor, ingest};
pub use process::{ProcessOutcome, ProcessSimulator, SimRequest, Simulator};
pub use report::{ReportRenderer, render};
