//! Per-entry employee rows for the manager's workforce review.

use std::collections::HashMap;

use chrono::TimeZone;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use shopfloor_core::{MachineId, UserId};

use crate::entry::ProductionEntry;
use crate::machine::Machine;

/// One production entry seen from the worker's side.
///
/// Missing measurements render as `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeRow {
    pub id: UserId,
    pub name: String,
    pub shift: String,
    pub parts_made: u32,
    pub defects: u32,
    pub avg_temp: f64,
    pub avg_vib: f64,
    pub avg_wear: f64,
    /// Calendar day of the entry in the review offset, `YYYY-MM-DD`.
    pub date: String,
    pub machine: String,
    pub detail: String,
}

/// One row per entry, oldest first.
pub fn employee_rows<Tz: TimeZone>(
    entries: &[ProductionEntry],
    machines: &HashMap<MachineId, Machine>,
    tz: &Tz,
) -> Vec<EmployeeRow> {
    let mut ordered: Vec<&ProductionEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.recorded_at);

    ordered
        .into_iter()
        .map(|entry| EmployeeRow {
            id: entry.worker,
            name: entry.worker_label(),
            shift: entry.shift.clone(),
            parts_made: entry.parts_made,
            defects: entry.defective_parts,
            avg_temp: or_zero(entry.temperature_c),
            avg_vib: or_zero(entry.vibration_mm),
            avg_wear: or_zero(entry.tool_wear_percent),
            date: entry
                .recorded_at
                .with_timezone(tz)
                .date_naive()
                .format("%Y-%m-%d")
                .to_string(),
            machine: machines
                .get(&entry.machine_id)
                .map(|m| m.name.clone())
                .unwrap_or_default(),
            detail: entry.detail_name.clone(),
        })
        .collect()
}

fn or_zero(value: Option<Decimal>) -> f64 {
    value.and_then(|d| d.to_f64()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone as _, Utc};
    use shopfloor_core::ProductionEntryId;

    use super::*;

    #[test]
    fn rows_default_missing_measurements_and_use_the_local_day() {
        let machine = Machine {
            id: MachineId::new(),
            name: "Press 4".into(),
            subdivision: "Stamping".into(),
            location_description: String::new(),
        };
        let worker = UserId::new();
        let late = ProductionEntry {
            id: ProductionEntryId::new(),
            worker,
            worker_name: String::new(),
            machine_id: machine.id,
            detail_name: "Bracket".into(),
            parts_made: 30,
            defective_parts: 2,
            temperature_c: Some(Decimal::new(4525, 2)),
            vibration_mm: None,
            tool_wear_percent: None,
            shift: "night".into(),
            note: String::new(),
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 1, 22, 30, 0).unwrap(),
        };
        let early = ProductionEntry {
            id: ProductionEntryId::new(),
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            ..late.clone()
        }
        .with_worker_name("Ivan");

        let machines = HashMap::from([(machine.id, machine)]);
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let rows = employee_rows(&[late, early], &machines, &tz);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Ivan");
        assert_eq!(rows[0].date, "2024-03-01");
        assert_eq!(rows[1].id, worker);
        assert_eq!(rows[1].name, worker.to_string());
        // 22:30 UTC is already the next day at +03:00.
        assert_eq!(rows[1].date, "2024-03-02");
        assert_eq!(rows[1].avg_temp, 45.25);
        assert_eq!(rows[1].avg_vib, 0.0);
        assert_eq!(rows[1].avg_wear, 0.0);
        assert_eq!((rows[1].parts_made, rows[1].defects), (30, 2));
        assert_eq!(rows[1].machine, "Press 4");
        assert_eq!(rows[1].detail, "Bracket");
    }
}
