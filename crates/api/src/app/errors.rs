use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use pantry_core::DomainError;
use pantry_infra::{FinalizeError, StoreError};

pub fn finalize_error_to_response(err: FinalizeError) -> Response {
    match err {
        FinalizeError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        e @ FinalizeError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", e.to_string())
        }
        FinalizeError::ProductNotFound(product) => json_error(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("product not found: {product}"),
        ),
        FinalizeError::Storage(e) => storage_failure(&e),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("not found: {what}")),
        e @ StoreError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", e.to_string())
        }
        StoreError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        e @ (StoreError::Corrupt(_) | StoreError::Backend(_)) => storage_failure(&e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        e @ DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", e.to_string())
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

/// Storage faults are logged in full and reported generically.
fn storage_failure(err: &StoreError) -> Response {
    tracing::error!(error = %err, "storage failure while handling request");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        "internal storage error",
    )
}

pub fn json_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn query_rejection(rejection: QueryRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
