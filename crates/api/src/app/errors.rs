use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use shopfloor_auth::AuthzError;
use shopfloor_core::DomainError;
use shopfloor_infra::LedgerError;
use shopfloor_inventory::FieldErrors;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Malformed(e) => {
            json_error(StatusCode::BAD_REQUEST, "malformed_request", e.to_string())
        }
        LedgerError::FieldValidation(errors) => field_errors_response(&errors),
        LedgerError::Domain(e) => domain_error_to_response(e),
        LedgerError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        LedgerError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        LedgerError::Persistence(msg) => {
            tracing::error!(error = %msg, "persistence failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_failure",
                "the change could not be saved",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

/// 400 with the combined message plus one `{field, message}` entry per invalid field.
pub fn field_errors_response(errors: &FieldErrors) -> axum::response::Response {
    let fields: Vec<serde_json::Value> = errors
        .errors()
        .iter()
        .map(|e| json!({ "field": e.field.as_str(), "message": e.to_string() }))
        .collect();
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.to_string(),
            "fields": fields,
        })),
    )
        .into_response()
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

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
