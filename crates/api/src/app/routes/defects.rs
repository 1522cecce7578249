use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use shopfloor_auth::permissions::{DEFECTS_READ_ALL, DEFECTS_READ_OWN, DEFECTS_REPORT};
use shopfloor_infra::store::DefectReportQuery;
use shopfloor_inventory::NewDefectReport;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

/// How many of their own reports a worker sees.
const OWN_REPORTS_LIMIT: usize = 20;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_reports).post(report_defect))
        .route("/mine", get(list_my_reports))
}

pub async fn report_defect(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &DEFECTS_REPORT) {
        return errors::forbidden(e);
    }
    let req: dto::ReportDefectRequest = match dto::parse_json(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let new = match NewDefectReport::new(
        req.tool_id,
        principal.user_id(),
        req.count(),
        req.description,
    ) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.ledger.record_defect(new).await {
        Ok((report, tool)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "report": dto::report_view(&report, &services.utc_offset),
                "row": dto::tool_view(&tool, &services.utc_offset),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_reports(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &DEFECTS_READ_ALL) {
        return errors::forbidden(e);
    }
    reports_response(&services, DefectReportQuery::all()).await
}

pub async fn list_my_reports(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &DEFECTS_READ_OWN) {
        return errors::forbidden(e);
    }
    let query = DefectReportQuery::by(principal.user_id()).limit(OWN_REPORTS_LIMIT);
    reports_response(&services, query).await
}

async fn reports_response(
    services: &AppServices,
    query: DefectReportQuery,
) -> axum::response::Response {
    match services.ledger.list_defect_reports(query).await {
        Ok(reports) => {
            let reports: Vec<_> = reports
                .iter()
                .map(|r| dto::report_view(r, &services.utc_offset))
                .collect();
            (StatusCode::OK, Json(serde_json::json!({ "reports": reports }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}
