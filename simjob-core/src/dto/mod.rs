//! Data Transfer Objects for the HTTP surface
//!
//! Request bodies accepted by the per-entity operations and the response
//! envelope every JSON operation returns. Ids arrive as optional strings so
//! that a missing or malformed id is reported as a validation error rather
//! than a framework rejection.

pub mod job;
pub mod record;
pub mod response;

use uuid::Uuid;

use crate::error::SimJobError;

/// Parses a required id field of a request body
pub fn require_uuid(field: &str, value: Option<&str>) -> Result<Uuid, SimJobError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SimJobError::Validation(format!("missing required field '{field}'")))?;

    Uuid::parse_str(raw)
        .map_err(|_| SimJobError::Validation(format!("field '{field}' is not a valid id: {raw}")))
}
