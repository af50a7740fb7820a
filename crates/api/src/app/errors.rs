//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use hallbook_core::DomainError;
use hallbook_workflow::{StoreError, WorkflowError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Storage failures keep their detail out of the response body; conflicts
/// and not-found carry the distinct, user-facing answers the transport
/// contract promises.
pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Conflict => json_error(
            StatusCode::CONFLICT,
            "booking_exists",
            "a booking exists for these dates",
        ),
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Storage(detail) => {
            tracing::error!(%detail, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_failure",
                "something went wrong",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
        }
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Store(err) => store_error_to_response(err),
        WorkflowError::Domain(err) => domain_error_to_response(err),
        WorkflowError::Collaborator(detail) => {
            tracing::error!(%detail, "collaborator failure");
            json_error(
                StatusCode::BAD_GATEWAY,
                "collaborator_failure",
                "a downstream service failed",
            )
        }
    }
}
