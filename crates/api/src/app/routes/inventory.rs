use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use shopfloor_auth::permissions::{INVENTORY_READ, INVENTORY_REGISTER, INVENTORY_UPDATE};
use shopfloor_core::ToolId;
use shopfloor_inventory::{ChangeSet, NewTool};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/tools", get(list_tools).post(register_tool))
        .route(
            "/tools/:id",
            get(get_tool).patch(update_tool).post(update_tool),
        )
}

pub async fn list_tools(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &INVENTORY_READ) {
        return errors::forbidden(e);
    }

    match services.ledger.list_tools().await {
        Ok(tools) => {
            let rows: Vec<_> = tools
                .iter()
                .map(|t| dto::tool_view(t, &services.utc_offset))
                .collect();
            (StatusCode::OK, Json(serde_json::json!({ "rows": rows }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn register_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &INVENTORY_REGISTER) {
        return errors::forbidden(e);
    }
    let new: NewTool = match dto::parse_json(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.ledger.register_tool(new).await {
        Ok(tool) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "row": dto::tool_view(&tool, &services.utc_offset) })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &INVENTORY_READ) {
        return errors::forbidden(e);
    }
    let id: ToolId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.get_tool(id).await {
        Ok(tool) => (
            StatusCode::OK,
            Json(serde_json::json!({ "row": dto::tool_view(&tool, &services.utc_offset) })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Partial update: only the recognized fields present in the body change.
pub async fn update_tool(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &INVENTORY_UPDATE) {
        return errors::forbidden(e);
    }
    let id: ToolId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let changes = match ChangeSet::from_json_bytes(&body) {
        Ok(c) => c,
        Err(e) => return errors::ledger_error_to_response(e.into()),
    };

    match services.ledger.update_tool(id, &changes).await {
        Ok(tool) => (
            StatusCode::OK,
            Json(serde_json::json!({ "row": dto::tool_view(&tool, &services.utc_offset) })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
