//! SimJob Core
//!
//! Core types and abstractions for the SimJob orchestration layer.
//!
//! This crate contains:
//! - Domain types: SimJob state record, parameter records, entity descriptors
//!   and the route registry
//! - DTOs: Request bodies and the response envelope of the HTTP surface
//! - Errors: The shared error taxonomy

pub mod domain;
pub mod dto;
pub mod error;

pub use error::{ErrorKind, Result, SimJobError};
