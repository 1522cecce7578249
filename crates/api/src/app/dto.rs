use axum::body::Bytes;
use axum::http::StatusCode;
use chrono::FixedOffset;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use shopfloor_core::{DefectReportId, ToolId, UserId};
use shopfloor_inventory::{DefectReport, Tool, ToolView};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ReportDefectRequest {
    pub tool_id: ToolId,
    /// Defaults to 1 when absent or `null`.
    #[serde(default)]
    pub defective_count: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ReportDefectRequest {
    pub fn count(&self) -> i64 {
        self.defective_count.unwrap_or(1)
    }
}

/// Decode a JSON request body, answering 400 `malformed_request` on failure.
///
/// Handlers take the raw body so every decoding error uses the same envelope.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, axum::response::Response> {
    serde_json::from_slice(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "malformed_request", e.to_string())
    })
}

// -------------------------
// Response mapping
// -------------------------

pub fn tool_view(tool: &Tool, offset: &FixedOffset) -> ToolView {
    ToolView::project(tool, offset)
}

#[derive(Debug, Serialize)]
pub struct DefectReportView {
    pub id: DefectReportId,
    pub tool_id: ToolId,
    pub reported_by: UserId,
    pub defective_count: u32,
    pub description: String,
    pub recorded_at: String,
}

pub fn report_view(report: &DefectReport, offset: &FixedOffset) -> DefectReportView {
    DefectReportView {
        id: report.id,
        tool_id: report.tool_id,
        reported_by: report.reported_by,
        defective_count: report.defective_count,
        description: report.description.clone(),
        recorded_at: report.recorded_at.with_timezone(offset).to_rfc3339(),
    }
}
