use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use shopfloor_core::{Entity, MachineId, ToolId, UserId};
use shopfloor_inventory::{DefectReport, FieldErrors, Tool, ToolState};
use shopfloor_production::{Machine, ProductionEntry};

use super::r#trait::{DefectReportQuery, ProductionStore, StoreError, ToolStore};

fn poisoned() -> StoreError {
    StoreError::Persistence("lock poisoned".to_string())
}

#[derive(Debug, Default)]
struct ToolRows {
    by_id: HashMap<ToolId, Arc<Mutex<Tool>>>,
    names: HashSet<String>,
}

/// In-memory tool store.
///
/// Intended for tests/dev. Each tool sits behind its own mutex, so writes to
/// one tool are serialized while different tools never contend.
#[derive(Debug, Default)]
pub struct InMemoryToolStore {
    rows: RwLock<ToolRows>,
    reports: Mutex<Vec<DefectReport>>,
}

impl InMemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, id: ToolId) -> Result<Arc<Mutex<Tool>>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        rows.by_id.get(&id).cloned().ok_or(StoreError::NotFound)
    }
}

#[async_trait::async_trait]
impl ToolStore for InMemoryToolStore {
    async fn insert_tool(&self, tool: &Tool) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.names.contains(&tool.name) {
            return Err(StoreError::Conflict(format!(
                "tool '{}' already exists",
                tool.name
            )));
        }
        if rows.by_id.contains_key(tool.id()) {
            return Err(StoreError::Conflict(format!("tool {} already exists", tool.id)));
        }
        rows.names.insert(tool.name.clone());
        rows.by_id.insert(*tool.id(), Arc::new(Mutex::new(tool.clone())));
        Ok(())
    }

    async fn get_tool(&self, id: ToolId) -> Result<Option<Tool>, StoreError> {
        match self.row(id) {
            Ok(row) => Ok(Some(row.lock().map_err(|_| poisoned())?.clone())),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut tools = rows
            .by_id
            .values()
            .map(|row| row.lock().map(|t| t.clone()).map_err(|_| poisoned()))
            .collect::<Result<Vec<_>, _>>()?;
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tools)
    }

    async fn replace_state(
        &self,
        id: ToolId,
        state: &ToolState,
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError> {
        let row = self.row(id)?;
        let mut tool = row.lock().map_err(|_| poisoned())?;
        tool.replace_state(state.clone(), at);
        Ok(tool.clone())
    }

    async fn update_state(
        &self,
        id: ToolId,
        update: &(dyn for<'s> Fn(&'s ToolState) -> Result<ToolState, FieldErrors> + Send + Sync),
        at: DateTime<Utc>,
    ) -> Result<Tool, StoreError> {
        let row = self.row(id)?;
        let mut tool = row.lock().map_err(|_| poisoned())?;
        let next = update(&tool.state()).map_err(StoreError::Rejected)?;
        tool.replace_state(next, at);
        Ok(tool.clone())
    }

    async fn record_defect(&self, report: &DefectReport) -> Result<Tool, StoreError> {
        let row = self.row(report.tool_id)?;
        let mut tool = row.lock().map_err(|_| poisoned())?;

        // Work on a copy so an overflow or a poisoned report log leaves the row as it was.
        let mut next = tool.clone();
        next.record_defect(report.defective_count, report.recorded_at)?;

        let mut reports = self.reports.lock().map_err(|_| poisoned())?;
        reports.push(report.clone());
        *tool = next;
        Ok(tool.clone())
    }

    async fn list_defect_reports(
        &self,
        query: DefectReportQuery,
    ) -> Result<Vec<DefectReport>, StoreError> {
        let reports = self.reports.lock().map_err(|_| poisoned())?;
        let mut matching: Vec<DefectReport> =
            reports.iter().filter(|r| query.matches(r)).cloned().collect();
        // Insertion order breaks ties between equal timestamps.
        matching.reverse();
        matching.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }
}

/// In-memory production log store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductionStore {
    machines: RwLock<HashMap<MachineId, Machine>>,
    entries: RwLock<Vec<ProductionEntry>>,
}

impl InMemoryProductionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProductionStore for InMemoryProductionStore {
    async fn insert_machine(&self, machine: &Machine) -> Result<(), StoreError> {
        let mut machines = self.machines.write().map_err(|_| poisoned())?;
        if machines.contains_key(machine.id()) {
            return Err(StoreError::Conflict(format!(
                "machine {} already exists",
                machine.id
            )));
        }
        if machines.values().any(|m| m.name == machine.name) {
            return Err(StoreError::Conflict(format!(
                "machine '{}' already exists",
                machine.name
            )));
        }
        machines.insert(*machine.id(), machine.clone());
        Ok(())
    }

    async fn get_machine(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        let machines = self.machines.read().map_err(|_| poisoned())?;
        Ok(machines.get(&id).cloned())
    }

    async fn list_machines(&self) -> Result<Vec<Machine>, StoreError> {
        let machines = self.machines.read().map_err(|_| poisoned())?;
        let mut all: Vec<Machine> = machines.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert_entry(&self, entry: &ProductionEntry) -> Result<(), StoreError> {
        // Hold the machine lock so the machine cannot vanish mid-insert.
        let machines = self.machines.read().map_err(|_| poisoned())?;
        if !machines.contains_key(&entry.machine_id) {
            return Err(StoreError::NotFound);
        }
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.push(entry.clone());
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<ProductionEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut all = entries.clone();
        all.sort_by_key(|e| e.recorded_at);
        Ok(all)
    }

    async fn list_worker_entries(
        &self,
        worker: UserId,
        limit: usize,
    ) -> Result<Vec<ProductionEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut mine: Vec<ProductionEntry> =
            entries.iter().filter(|e| e.worker == worker).cloned().collect();
        mine.reverse();
        mine.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use shopfloor_core::{DefectReportId, DomainError};
    use shopfloor_inventory::NewTool;

    use super::*;

    fn tool(name: &str, defective: u32) -> Tool {
        let mut new = NewTool::named(name);
        new.stock = 10;
        new.defective_stock = defective;
        new.min_threshold = 3;
        new.into_tool(ToolId::new(), Utc::now())
    }

    fn report(tool_id: ToolId, count: u32, at: DateTime<Utc>) -> DefectReport {
        DefectReport {
            id: DefectReportId::new(),
            tool_id,
            reported_by: UserId::new(),
            defective_count: count,
            description: String::new(),
            recorded_at: at,
        }
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let store = InMemoryToolStore::new();
        store.insert_tool(&tool("Drill 6mm", 0)).await.unwrap();
        let err = store.insert_tool(&tool("Drill 6mm", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let store = InMemoryToolStore::new();
        for name in ["Tap M8", "Drill 6mm", "Reamer 10H7"] {
            store.insert_tool(&tool(name, 0)).await.unwrap();
        }
        let names: Vec<String> = store
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Drill 6mm", "Reamer 10H7", "Tap M8"]);
    }

    #[tokio::test]
    async fn replace_state_on_missing_tool_is_not_found() {
        let store = InMemoryToolStore::new();
        let state = tool("x", 0).state();
        let err = store
            .replace_state(ToolId::new(), &state, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn overflowing_defect_leaves_tool_and_log_untouched() {
        let store = InMemoryToolStore::new();
        let t = tool("Insert CNMG", u32::MAX - 1);
        store.insert_tool(&t).await.unwrap();

        let err = store
            .record_defect(&report(t.id, 2, Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));

        let stored = store.get_tool(t.id).await.unwrap().unwrap();
        assert_eq!(stored, t);
        assert!(store.list_defect_reports(DefectReportQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_defect_reports_are_all_counted() {
        let store = Arc::new(InMemoryToolStore::new());
        let t = tool("End mill 12mm", 2);
        store.insert_tool(&t).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let id = t.id;
            handles.push(tokio::spawn(async move {
                store.record_defect(&report(id, 3, Utc::now())).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let stored = store.get_tool(t.id).await.unwrap().unwrap();
        assert_eq!(stored.defective_stock, 2 + 50 * 3);
        assert_eq!(
            store.list_defect_reports(DefectReportQuery::all()).await.unwrap().len(),
            50
        );
    }

    #[tokio::test]
    async fn reports_are_newest_first_and_filterable() {
        let store = InMemoryToolStore::new();
        let t = tool("Tap M6", 0);
        store.insert_tool(&t).await.unwrap();

        let now = Utc::now();
        let old = report(t.id, 1, now - Duration::hours(2));
        let mut mine = report(t.id, 2, now - Duration::hours(1));
        let newest = report(t.id, 3, now);
        let me = UserId::new();
        mine.reported_by = me;
        for r in [&old, &mine, &newest] {
            store.record_defect(r).await.unwrap();
        }

        let all = store.list_defect_reports(DefectReportQuery::all()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newest.id, mine.id, old.id]);

        let own = store.list_defect_reports(DefectReportQuery::by(me)).await.unwrap();
        assert_eq!(own, vec![mine]);

        let limited = store
            .list_defect_reports(DefectReportQuery::all().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, newest.id);
    }

    #[tokio::test]
    async fn update_state_sees_the_latest_row_and_rejects_cleanly() {
        let store = InMemoryToolStore::new();
        let t = tool("Tap M8", 2);
        store.insert_tool(&t).await.unwrap();
        store.record_defect(&report(t.id, 3, Utc::now())).await.unwrap();

        let updated = store
            .update_state(
                t.id,
                &|current| {
                    let mut next = current.clone();
                    next.stock = 40;
                    Ok(next)
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!((updated.stock, updated.defective_stock), (40, 5));

        let changes = shopfloor_inventory::ChangeSet::new()
            .with(shopfloor_inventory::ToolField::Stock, "-1");
        let err = store
            .update_state(
                t.id,
                &|current| shopfloor_inventory::validate_and_apply(current, &changes),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(store.get_tool(t.id).await.unwrap(), Some(updated));

        let missing = store
            .update_state(ToolId::new(), &|current| Ok(current.clone()), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(missing, StoreError::NotFound));
    }

    #[tokio::test]
    async fn entries_require_a_known_machine() {
        let store = InMemoryProductionStore::new();
        let entry = ProductionEntry {
            id: shopfloor_core::ProductionEntryId::new(),
            worker: UserId::new(),
            worker_name: String::new(),
            machine_id: MachineId::new(),
            detail_name: "Flange".into(),
            parts_made: 5,
            defective_parts: 0,
            temperature_c: None,
            vibration_mm: None,
            tool_wear_percent: None,
            shift: String::new(),
            note: String::new(),
            recorded_at: Utc::now(),
        };
        let err = store.insert_entry(&entry).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        store
            .insert_machine(&Machine {
                id: entry.machine_id,
                name: "Mill 2".into(),
                subdivision: "Shop 2".into(),
                location_description: String::new(),
            })
            .await
            .unwrap();
        store.insert_entry(&entry).await.unwrap();
        assert_eq!(store.list_entries().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn machine_names_are_unique() {
        let store = InMemoryProductionStore::new();
        let machine = |name: &str| Machine {
            id: MachineId::new(),
            name: name.into(),
            subdivision: "Shop 1".into(),
            location_description: String::new(),
        };
        store.insert_machine(&machine("Lathe 1")).await.unwrap();
        let err = store.insert_machine(&machine("Lathe 1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_machines().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn worker_entries_are_newest_first_and_limited() {
        let store = InMemoryProductionStore::new();
        let machine = Machine {
            id: MachineId::new(),
            name: "Mill 1".into(),
            subdivision: String::new(),
            location_description: String::new(),
        };
        store.insert_machine(&machine).await.unwrap();

        let worker = UserId::new();
        let now = Utc::now();
        let entry = |who: UserId, minutes_ago: i64| ProductionEntry {
            id: shopfloor_core::ProductionEntryId::new(),
            worker: who,
            worker_name: String::new(),
            machine_id: machine.id,
            detail_name: "Pin".into(),
            parts_made: 1,
            defective_parts: 0,
            temperature_c: None,
            vibration_mm: None,
            tool_wear_percent: None,
            shift: String::new(),
            note: String::new(),
            recorded_at: now - Duration::minutes(minutes_ago),
        };
        let oldest = entry(worker, 30);
        let middle = entry(worker, 20);
        let newest = entry(worker, 10);
        for e in [&middle, &newest, &entry(UserId::new(), 5), &oldest] {
            store.insert_entry(e).await.unwrap();
        }

        let mine = store.list_worker_entries(worker, 2).await.unwrap();
        assert_eq!(mine, vec![newest, middle]);
        assert_eq!(store.list_worker_entries(worker, 20).await.unwrap().len(), 3);
    }
}
