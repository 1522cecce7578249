//! Stock ledger: the only component that persists tool counter changes.
//!
//! Two write paths exist and never mix:
//! - **replace** (`update_tool` / `apply`): a manager's partial update is run
//!   through the validation engine and the full resulting state is written.
//!   `update_tool` validates against the state read under the row lock, so a
//!   concurrent defect report is never undone. Between two manager edits the
//!   last write wins; there is no concurrency token.
//! - **increment** (`record_defect`): a worker's defect report adds to
//!   `defective_stock` atomically with appending the report.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use shopfloor_core::{DefectReportId, DomainError, ToolId};
use shopfloor_inventory::{
    ChangeSet, DefectReport, FieldErrors, MalformedRequest, NewDefectReport, NewTool, Tool,
    ToolState, validate_and_apply,
};

use crate::store::{DefectReportQuery, StoreError, ToolStore};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Malformed(#[from] MalformedRequest),

    #[error("{0}")]
    FieldValidation(#[from] FieldErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Domain(e) => Self::Domain(e),
            StoreError::Rejected(errors) => Self::FieldValidation(errors),
            StoreError::Persistence(msg) => Self::Persistence(msg),
        }
    }
}

/// Stock ledger over an explicit store handle.
#[derive(Debug, Clone)]
pub struct StockLedger<S> {
    store: S,
}

impl<S> StockLedger<S>
where
    S: ToolStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a tool. The name must be unique.
    pub async fn register_tool(&self, new: NewTool) -> Result<Tool, LedgerError> {
        let tool = new.validate()?.into_tool(ToolId::new(), Utc::now());
        self.store.insert_tool(&tool).await?;
        info!(tool_id = %tool.id, name = %tool.name, stock = tool.stock, "tool registered");
        Ok(tool)
    }

    pub async fn get_tool(&self, id: ToolId) -> Result<Tool, LedgerError> {
        self.store.get_tool(id).await?.ok_or(LedgerError::NotFound)
    }

    /// All tools, ordered by name.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, LedgerError> {
        Ok(self.store.list_tools().await?)
    }

    /// Validate a partial update against the stored tool and persist the result.
    ///
    /// On any field error nothing is written and every error is returned.
    pub async fn update_tool(&self, id: ToolId, changes: &ChangeSet) -> Result<Tool, LedgerError> {
        let tool = self
            .store
            .update_state(id, &|current| validate_and_apply(current, changes), Utc::now())
            .await?;
        info!(
            tool_id = %tool.id,
            fields = ?changes.fields().collect::<Vec<_>>(),
            stock = tool.stock,
            defective_stock = tool.defective_stock,
            min_threshold = tool.min_threshold,
            "tool updated"
        );
        Ok(tool)
    }

    /// Replace path: overwrite counters, location and outflow in one write.
    pub async fn apply(&self, id: ToolId, state: ToolState) -> Result<Tool, LedgerError> {
        let tool = self.store.replace_state(id, &state, Utc::now()).await?;
        info!(
            tool_id = %tool.id,
            stock = tool.stock,
            defective_stock = tool.defective_stock,
            min_threshold = tool.min_threshold,
            "tool state replaced"
        );
        Ok(tool)
    }

    /// Increment path: append the report and bump `defective_stock` atomically.
    pub async fn record_defect(
        &self,
        report: NewDefectReport,
    ) -> Result<(DefectReport, Tool), LedgerError> {
        let report = report.into_report(DefectReportId::new(), Utc::now());
        let tool = self.store.record_defect(&report).await?;
        info!(
            tool_id = %tool.id,
            report_id = %report.id,
            reported_by = %report.reported_by,
            defective_count = report.defective_count,
            defective_stock = tool.defective_stock,
            "defect recorded"
        );
        Ok((report, tool))
    }

    /// Defect reports, newest first.
    pub async fn list_defect_reports(
        &self,
        query: DefectReportQuery,
    ) -> Result<Vec<DefectReport>, LedgerError> {
        Ok(self.store.list_defect_reports(query).await?)
    }
}
