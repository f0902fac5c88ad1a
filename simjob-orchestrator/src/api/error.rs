//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use simjob_core::SimJobError;
use simjob_core::dto::response::ApiResponse;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl From<SimJobError> for ApiError {
    fn from(err: SimJobError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::InternalError(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(SimJobError::Validation(rejection.body_text()).to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |err: SimJobError| ApiError::from(err).into_response().status();

        assert_eq!(status(SimJobError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(SimJobError::Conflict("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(SimJobError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status(SimJobError::Render("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
