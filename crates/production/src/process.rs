//! Process-row projection for the manager's quality review.

use std::collections::HashMap;

use chrono::TimeZone;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use shopfloor_core::{MachineId, ProductionEntryId};

use crate::entry::ProductionEntry;
use crate::machine::Machine;

/// One measured production entry, flattened for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRow {
    pub id: ProductionEntryId,
    /// Temperature, °C.
    pub t: f64,
    /// Vibration, mm/s.
    pub v: f64,
    /// Tool wear, %.
    pub w: f64,
    /// 1 when the entry recorded any defective parts.
    pub defect: u8,
    pub machine: String,
    pub machine_subdivision: String,
    pub ts: String,
    pub detail: String,
    pub shift: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessReport {
    pub rows: Vec<ProcessRow>,
    pub warnings: Vec<String>,
}

/// Build process rows, oldest first. Entries without a full set of
/// measurements (or pointing at an unknown machine) are skipped with a warning.
pub fn process_rows<Tz>(
    entries: &[ProductionEntry],
    machines: &HashMap<MachineId, Machine>,
    tz: &Tz,
) -> ProcessReport
where
    Tz: TimeZone,
    Tz::Offset: core::fmt::Display,
{
    let mut ordered: Vec<&ProductionEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.recorded_at);

    let mut report = ProcessReport::default();
    for entry in ordered {
        let local = entry.recorded_at.with_timezone(tz);
        let (Some(t), Some(v), Some(w)) = (
            entry.temperature_c,
            entry.vibration_mm,
            entry.tool_wear_percent,
        ) else {
            report.warnings.push(format!(
                "entry {} from {} skipped: no measurements",
                entry.id,
                local.format("%Y-%m-%d %H:%M")
            ));
            continue;
        };
        let Some(machine) = machines.get(&entry.machine_id) else {
            report.warnings.push(format!(
                "entry {} from {} skipped: unknown machine {}",
                entry.id,
                local.format("%Y-%m-%d %H:%M"),
                entry.machine_id
            ));
            continue;
        };

        report.rows.push(ProcessRow {
            id: entry.id,
            t: as_f64(t),
            v: as_f64(v),
            w: as_f64(w),
            defect: u8::from(entry.defective_parts > 0),
            machine: machine.name.clone(),
            machine_subdivision: machine.subdivision.clone(),
            ts: local.to_rfc3339(),
            detail: entry.detail_name.clone(),
            shift: entry.shift.clone(),
        });
    }
    report
}

fn as_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use chrono::{Duration, Utc};
    use shopfloor_core::UserId;

    use super::*;

    fn machine() -> Machine {
        Machine {
            id: MachineId::new(),
            name: "Lathe 3".into(),
            subdivision: "Shop 1".into(),
            location_description: String::new(),
        }
    }

    fn entry(machine_id: MachineId, minutes_ago: i64, measured: bool, defective: u32) -> ProductionEntry {
        let dec = |s: &str| Decimal::from_str(s).unwrap();
        ProductionEntry {
            id: ProductionEntryId::new(),
            worker: UserId::new(),
            worker_name: String::new(),
            machine_id,
            detail_name: "Shaft".into(),
            parts_made: 10,
            defective_parts: defective,
            temperature_c: measured.then(|| dec("60.50")),
            vibration_mm: measured.then(|| dec("1.200")),
            tool_wear_percent: measured.then(|| dec("10.00")),
            shift: "day".into(),
            note: String::new(),
            recorded_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn rows_are_oldest_first_and_unmeasured_entries_warn() {
        let m = machine();
        let machines = HashMap::from([(m.id, m.clone())]);
        let newer = entry(m.id, 5, true, 0);
        let older = entry(m.id, 50, true, 2);
        let skipped = entry(m.id, 20, false, 0);

        let report = process_rows(&[newer.clone(), skipped.clone(), older.clone()], &machines, &Utc);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].id, older.id);
        assert_eq!(report.rows[0].defect, 1);
        assert_eq!(report.rows[1].id, newer.id);
        assert_eq!(report.rows[1].defect, 0);
        assert_eq!(report.rows[0].t, 60.5);
        assert_eq!(report.rows[0].machine, "Lathe 3");
        assert_eq!(report.rows[0].machine_subdivision, "Shop 1");

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains(&skipped.id.to_string()));
        assert!(report.warnings[0].ends_with("skipped: no measurements"));
    }

    #[test]
    fn unknown_machine_is_skipped() {
        let report = process_rows(&[entry(MachineId::new(), 1, true, 0)], &HashMap::new(), &Utc);
        assert!(report.rows.is_empty());
        assert!(report.warnings[0].contains("unknown machine"));
    }
}
