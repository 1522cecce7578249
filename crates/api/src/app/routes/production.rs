use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use shopfloor_auth::permissions::{
    MACHINES_REGISTER, PRODUCTION_READ_OWN, PRODUCTION_RECORD, PRODUCTION_REVIEW,
};
use shopfloor_production::{NewMachine, NewProductionEntry};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

/// Entries shown on a worker's own dashboard.
pub const OWN_ENTRIES_LIMIT: usize = 20;

pub fn router() -> Router {
    Router::new()
        .route("/machines", get(list_machines).post(register_machine))
        .route("/entries", post(record_entry))
        .route("/entries/mine", get(my_entries))
        .route("/process", get(process_rows))
        .route("/employees", get(employee_rows))
}

pub async fn register_machine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &MACHINES_REGISTER) {
        return errors::forbidden(e);
    }
    let new: NewMachine = match dto::parse_json(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.production.register_machine(new).await {
        Ok(machine) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "machine": machine })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Any identified user may list machines; workers need them to log entries.
pub async fn list_machines(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.production.list_machines().await {
        Ok(machines) => {
            (StatusCode::OK, Json(serde_json::json!({ "machines": machines }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn record_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &PRODUCTION_RECORD) {
        return errors::forbidden(e);
    }
    let new: NewProductionEntry = match dto::parse_json(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let worker_name = principal.display_name().unwrap_or_default();
    match services
        .production
        .record_entry(principal.user_id(), worker_name, new)
        .await
    {
        Ok(entry) => {
            (StatusCode::CREATED, Json(serde_json::json!({ "entry": entry }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn process_rows(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &PRODUCTION_REVIEW) {
        return errors::forbidden(e);
    }

    match services.production.process_report(&services.utc_offset).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn my_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &PRODUCTION_READ_OWN) {
        return errors::forbidden(e);
    }

    match services
        .production
        .recent_entries(principal.user_id(), OWN_ENTRIES_LIMIT)
        .await
    {
        Ok(entries) => {
            (StatusCode::OK, Json(serde_json::json!({ "entries": entries }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn employee_rows(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &PRODUCTION_REVIEW) {
        return errors::forbidden(e);
    }

    match services.production.employee_rows(&services.utc_offset).await {
        Ok(rows) => (StatusCode::OK, Json(serde_json::json!({ "rows": rows }))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
