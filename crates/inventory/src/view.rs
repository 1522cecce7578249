//! Read-only tool projection returned after every ledger mutation and used by
//! review screens and bulk export.

use chrono::TimeZone;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use shopfloor_core::ToolId;

use crate::tool::Tool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolView {
    pub id: ToolId,
    pub tool_name: String,
    pub stock: u32,
    pub defective_stock: u32,
    pub min_threshold: u32,
    pub location: String,
    /// `null` when unknown, never `0`.
    pub avg_daily_outflow: Option<f64>,
    /// RFC 3339 timestamp in the caller's time zone.
    pub updated_at: String,
}

impl ToolView {
    pub fn project<Tz>(tool: &Tool, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: core::fmt::Display,
    {
        Self {
            id: tool.id,
            tool_name: tool.name.clone(),
            stock: tool.stock,
            defective_stock: tool.defective_stock,
            min_threshold: tool.min_threshold,
            location: tool.location.clone(),
            avg_daily_outflow: tool.avg_daily_outflow.and_then(|d| d.to_f64()),
            updated_at: tool.last_updated_at.with_timezone(tz).to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use chrono::{FixedOffset, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::tool::NewTool;

    #[test]
    fn projects_timestamp_in_given_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let tool = NewTool::named("Reamer").into_tool(ToolId::new(), at);
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();

        let view = ToolView::project(&tool, &moscow);
        assert_eq!(view.updated_at, "2024-03-01T12:30:00+03:00");
        assert_eq!(ToolView::project(&tool, &Utc).updated_at, "2024-03-01T09:30:00+00:00");
    }

    #[test]
    fn unset_outflow_projects_as_null() {
        let tool = NewTool::named("Reamer").into_tool(ToolId::new(), Utc::now());
        let view = ToolView::project(&tool, &Utc);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["avg_daily_outflow"].is_null());
        assert_eq!(json["stock"], 0);
        assert_eq!(json["tool_name"], "Reamer");
    }

    #[test]
    fn outflow_projects_as_number() {
        let mut req = NewTool::named("Reamer");
        req.avg_daily_outflow = Some(Decimal::from_str("4.50").unwrap());
        let tool = req.into_tool(ToolId::new(), Utc::now());
        let json = serde_json::to_value(ToolView::project(&tool, &Utc)).unwrap();
        assert_eq!(json["avg_daily_outflow"], 4.5);
    }
}
