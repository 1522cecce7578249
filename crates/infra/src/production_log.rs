//! Production log service: machine registry, worker entries and the
//! manager's process and employee reviews.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use tracing::info;

use shopfloor_core::{MachineId, ProductionEntryId, UserId};
use shopfloor_production::{
    EmployeeRow, Machine, NewMachine, NewProductionEntry, ProcessReport, ProductionEntry,
    employee_rows, process_rows,
};

use crate::ledger::LedgerError;
use crate::store::ProductionStore;

#[derive(Debug, Clone)]
pub struct ProductionLog<S> {
    store: S,
}

impl<S> ProductionLog<S>
where
    S: ProductionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn register_machine(&self, new: NewMachine) -> Result<Machine, LedgerError> {
        let machine = new.validate()?.into_machine(MachineId::new());
        self.store.insert_machine(&machine).await?;
        info!(machine_id = %machine.id, name = %machine.name, "machine registered");
        Ok(machine)
    }

    pub async fn list_machines(&self) -> Result<Vec<Machine>, LedgerError> {
        Ok(self.store.list_machines().await?)
    }

    /// Validate and store one worker entry. The machine must exist.
    pub async fn record_entry(
        &self,
        worker: UserId,
        worker_name: &str,
        new: NewProductionEntry,
    ) -> Result<ProductionEntry, LedgerError> {
        let entry = new
            .validate(ProductionEntryId::new(), worker, Utc::now())?
            .with_worker_name(worker_name);
        if self.store.get_machine(entry.machine_id).await?.is_none() {
            return Err(LedgerError::NotFound);
        }
        self.store.insert_entry(&entry).await?;
        info!(
            entry_id = %entry.id,
            machine_id = %entry.machine_id,
            worker = %worker,
            parts_made = entry.parts_made,
            defective_parts = entry.defective_parts,
            "production entry recorded"
        );
        Ok(entry)
    }

    /// Measured entries as process rows, oldest first, timestamps rendered in `tz`.
    pub async fn process_report<Tz>(&self, tz: &Tz) -> Result<ProcessReport, LedgerError>
    where
        Tz: TimeZone,
        Tz::Offset: core::fmt::Display,
    {
        let entries = self.store.list_entries().await?;
        let machines = self.machines_by_id().await?;
        Ok(process_rows(&entries, &machines, tz))
    }

    /// Every entry as an employee row, oldest first, dated in `tz`.
    pub async fn employee_rows<Tz: TimeZone>(
        &self,
        tz: &Tz,
    ) -> Result<Vec<EmployeeRow>, LedgerError> {
        let entries = self.store.list_entries().await?;
        let machines = self.machines_by_id().await?;
        Ok(employee_rows(&entries, &machines, tz))
    }

    /// A worker's own most recent entries, newest first.
    pub async fn recent_entries(
        &self,
        worker: UserId,
        limit: usize,
    ) -> Result<Vec<ProductionEntry>, LedgerError> {
        Ok(self.store.list_worker_entries(worker, limit).await?)
    }

    async fn machines_by_id(&self) -> Result<HashMap<MachineId, Machine>, LedgerError> {
        Ok(self
            .store
            .list_machines()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect())
    }
}
