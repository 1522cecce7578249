use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use shopfloor_core::{DomainError, MachineId, ToolId, UserId};
use shopfloor_inventory::{DefectReport, FieldErrors, Tool, ToolState};
use shopfloor_production::{Machine, ProductionEntry};

/// Storage-level failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated (e.g. duplicate tool name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The stored record rejected the change (e.g. counter overflow).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A guarded update refused the current state; nothing was written.
    #[error("{0}")]
    Rejected(FieldErrors),

    /// The backing store failed. Never retried.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Filter for defect report listings. Results are always newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefectReportQuery {
    pub reported_by: Option<UserId>,
    pub limit: Option<usize>,
}

impl DefectReportQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by(reporter: UserId) -> Self {
        Self {
            reported_by: Some(reporter),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, report: &DefectReport) -> bool {
        self.reported_by.is_none_or(|who| report.reported_by == who)
    }
}

/// Persistence boundary for tools and their defect reports.
///
/// Implementations must serialize writes per tool id: a `record_defect` never
/// loses an increment, no matter how many run concurrently.
#[async_trait::async_trait]
pub trait ToolStore: Send + Sync {
    /// Insert a new tool. Fails with `Conflict` when the name is taken.
    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError>;

    async fn get_tool(&self, id: ToolId) -> Result<Option<Tool>, StoreError>;

    /// All tools, ordered by name.
    async fn list_tools(&self) -> Result<Vec<Tool>, StoreError>;

    /// Overwrite the mutable state of one tool in a single write (last write wins).
    async fn replace_state(
        &self,
        id: ToolId,
        state: &ToolState,
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError>;

    /// Derive the next state from the stored one and write it, holding the
    /// tool's row lock throughout.
    ///
    /// A concurrent `record_defect` lands either before the read or after the
    /// write, so fields `update` leaves alone keep their latest value.
    async fn update_state(
        &self,
        id: ToolId,
        update: &(dyn for<'s> Fn(&'s ToolState) -> Result<ToolState, FieldErrors> + Send + Sync),
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError>;

    /// Append `report` and add its count to the tool's `defective_stock`.
    ///
    /// Both happen or neither does.
    async fn record_defect(&self, report: &DefectReport) -> Result<Tool, StoreError>;

    async fn list_defect_reports(
        &self,
        query: DefectReportQuery,
    ) -> Result<Vec<DefectReport>, StoreError>;
}

#[async_trait::async_trait]
impl<S> ToolStore for Arc<S>
where
    S: ToolStore + ?Sized,
{
    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        (**self).insert_tool(tool).await
    }

    async fn get_tool(&self, id: ToolId) -> Result<Option<Tool>, StoreError> {
        (**self).get_tool(id).await
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, StoreError> {
        (**self).list_tools().await
    }

    async fn replace_state(
        &self,
        id: ToolId,
        state: &ToolState,
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError> {
        (**self).replace_state(id, state, at).await
    }

    async fn update_state(
        &self,
        id: ToolId,
        update: &(dyn for<'s> Fn(&'s ToolState) -> Result<ToolState, FieldErrors> + Send + Sync),
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError> {
        (**self).update_state(id, update, at).await
    }

    async fn record_defect(&self, report: &DefectReport) -> Result<Tool, StoreError> {
        (**self).record_defect(report).await
    }

    async fn list_defect_reports(
        &self,
        query: DefectReportQuery,
    ) -> Result<Vec<DefectReport>, StoreError> {
        (**self).list_defect_reports(query).await
    }
}

/// Persistence boundary for machines and production entries.
#[async_trait::async_trait]
pub trait ProductionStore: Send + Sync {
    /// Fails with `Conflict` when the name is taken.
    async fn insert_machine(&self, machine: &Machine) -> Result<(), StoreError>;

    async fn get_machine(&self, id: MachineId) -> Result<Option<Machine>, StoreError>;

    /// All machines, ordered by name.
    async fn list_machines(&self) -> Result<Vec<Machine>, StoreError>;

    /// Fails with `NotFound` when the entry's machine does not exist.
    async fn insert_entry(&self, entry: &ProductionEntry) -> Result<(), StoreError>;

    /// All entries, oldest first.
    async fn list_entries(&self) -> Result<Vec<ProductionEntry>, StoreError>;

    /// One worker's most recent entries, newest first.
    async fn list_worker_entries(
        &self,
        worker: UserId,
        limit: usize,
    ) -> Result<Vec<ProductionEntry>, StoreError>;
}

#[async_trait::async_trait]
impl<S> ProductionStore for Arc<S>
where
    S: ProductionStore + ?Sized,
{
    async fn insert_machine(&self, machine: &Machine) -> Result<(), StoreError> {
        (**self).insert_machine(machine).await
    }

    async fn get_machine(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        (**self).get_machine(id).await
    }

    async fn list_machines(&self) -> Result<Vec<Machine>, StoreError> {
        (**self).list_machines().await
    }

    async fn insert_entry(&self, entry: &ProductionEntry) -> Result<(), StoreError> {
        (**self).insert_entry(entry).await
    }

    async fn list_entries(&self) -> Result<Vec<ProductionEntry>, StoreError> {
        (**self).list_entries().await
    }

    async fn list_worker_entries(
        &self,
        worker: UserId,
        limit: usize,
    ) -> Result<Vec<ProductionEntry>, StoreError> {
        (**self).list_worker_entries(worker, limit).await
    }
}
