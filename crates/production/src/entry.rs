use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use shopfloor_core::{DomainError, DomainResult, Entity, MachineId, ProductionEntryId, UserId};

const DETAIL_MAX_LEN: usize = 160;
const SHIFT_MAX_LEN: usize = 40;
const WORKER_NAME_MAX_LEN: usize = 150;

/// One worker submission of produced parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionEntry {
    pub id: ProductionEntryId,
    pub worker: UserId,
    /// Display name forwarded with the worker's identity; may be empty.
    #[serde(default)]
    pub worker_name: String,
    pub machine_id: MachineId,
    pub detail_name: String,
    pub parts_made: u32,
    pub defective_parts: u32,
    pub temperature_c: Option<Decimal>,
    pub vibration_mm: Option<Decimal>,
    pub tool_wear_percent: Option<Decimal>,
    pub shift: String,
    pub note: String,
    pub recorded_at: DateTime<Utc>,
}

impl Entity for ProductionEntry {
    type Id = ProductionEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ProductionEntry {
    /// Whether every process measurement was taken.
    pub fn is_measured(&self) -> bool {
        self.temperature_c.is_some() && self.vibration_mm.is_some() && self.tool_wear_percent.is_some()
    }

    /// Attach the worker's display name, trimmed and cut to 150 characters.
    pub fn with_worker_name(mut self, name: &str) -> Self {
        self.worker_name = name.trim().chars().take(WORKER_NAME_MAX_LEN).collect();
        self
    }

    /// The display name, or the worker id when none was given.
    pub fn worker_label(&self) -> String {
        if self.worker_name.is_empty() {
            self.worker.to_string()
        } else {
            self.worker_name.clone()
        }
    }
}

/// Entry as submitted by a worker, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProductionEntry {
    pub machine_id: MachineId,
    pub detail_name: String,
    pub parts_made: i64,
    #[serde(default)]
    pub defective_parts: i64,
    #[serde(default)]
    pub temperature_c: Option<Decimal>,
    #[serde(default)]
    pub vibration_mm: Option<Decimal>,
    #[serde(default)]
    pub tool_wear_percent: Option<Decimal>,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub note: String,
}

/// Digits allowed for one measurement column: (total digits, fractional digits).
struct Precision {
    field: &'static str,
    digits: u32,
    scale: u32,
}

const TEMPERATURE: Precision = Precision { field: "temperature_c", digits: 5, scale: 2 };
const VIBRATION: Precision = Precision { field: "vibration_mm", digits: 5, scale: 3 };
const TOOL_WEAR: Precision = Precision { field: "tool_wear_percent", digits: 6, scale: 2 };

impl NewProductionEntry {
    /// Validate every field and build the entry.
    ///
    /// All problems are reported together, joined into one validation message.
    pub fn validate(
        self,
        id: ProductionEntryId,
        worker: UserId,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<ProductionEntry> {
        let mut errors: Vec<String> = Vec::new();

        let detail_name = self.detail_name.trim().to_string();
        if detail_name.is_empty() {
            errors.push("detail_name cannot be empty".to_string());
        } else if detail_name.chars().count() > DETAIL_MAX_LEN {
            errors.push(format!("detail_name must be at most {DETAIL_MAX_LEN} characters"));
        }
        if self.shift.chars().count() > SHIFT_MAX_LEN {
            errors.push(format!("shift must be at most {SHIFT_MAX_LEN} characters"));
        }

        let parts_made = count("parts_made", self.parts_made, &mut errors);
        let defective_parts = count("defective_parts", self.defective_parts, &mut errors);
        let temperature_c = measurement(&TEMPERATURE, self.temperature_c, &mut errors);
        let vibration_mm = measurement(&VIBRATION, self.vibration_mm, &mut errors);
        let tool_wear_percent = measurement(&TOOL_WEAR, self.tool_wear_percent, &mut errors);

        if !errors.is_empty() {
            return Err(DomainError::validation(errors.join(" ")));
        }

        Ok(ProductionEntry {
            id,
            worker,
            worker_name: String::new(),
            machine_id: self.machine_id,
            detail_name,
            parts_made,
            defective_parts,
            temperature_c,
            vibration_mm,
            tool_wear_percent,
            shift: self.shift,
            note: self.note,
            recorded_at,
        })
    }
}

fn count(field: &str, value: i64, errors: &mut Vec<String>) -> u32 {
    if value < 0 {
        errors.push(format!("{field} must be non-negative"));
        return 0;
    }
    u32::try_from(value).unwrap_or_else(|_| {
        errors.push(format!("{field} must be at most {}", u32::MAX));
        0
    })
}

fn measurement(p: &Precision, value: Option<Decimal>, errors: &mut Vec<String>) -> Option<Decimal> {
    let value = value?;
    let mut rounded = value.round_dp_with_strategy(p.scale, RoundingStrategy::MidpointNearestEven);
    let limit = Decimal::from(10_i64.pow(p.digits - p.scale));
    if rounded.abs() >= limit {
        errors.push(format!("{} must be less than {limit} in magnitude", p.field));
        return None;
    }
    rounded.rescale(p.scale);
    Some(rounded)
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use proptest::prelude::*;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn submission() -> NewProductionEntry {
        NewProductionEntry {
            machine_id: MachineId::new(),
            detail_name: "Gear housing".into(),
            parts_made: 40,
            defective_parts: 1,
            temperature_c: Some(dec("61.5")),
            vibration_mm: Some(dec("1.2345")),
            tool_wear_percent: Some(dec("12")),
            shift: "night".into(),
            note: String::new(),
        }
    }

    #[test]
    fn valid_entry_is_normalized() {
        let entry = submission()
            .validate(ProductionEntryId::new(), UserId::new(), Utc::now())
            .unwrap();
        assert_eq!(entry.temperature_c.unwrap().to_string(), "61.50");
        assert_eq!(entry.vibration_mm.unwrap().to_string(), "1.234");
        assert_eq!(entry.tool_wear_percent.unwrap().to_string(), "12.00");
        assert!(entry.is_measured());
    }

    #[test]
    fn errors_are_reported_together() {
        let mut s = submission();
        s.detail_name = "  ".into();
        s.parts_made = -1;
        s.temperature_c = Some(dec("1000"));

        let err = s
            .validate(ProductionEntryId::new(), UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "detail_name cannot be empty parts_made must be non-negative \
                 temperature_c must be less than 1000 in magnitude"
            )
        );
    }

    #[test]
    fn negative_temperature_is_allowed() {
        let mut s = submission();
        s.temperature_c = Some(dec("-12.25"));
        let entry = s
            .validate(ProductionEntryId::new(), UserId::new(), Utc::now())
            .unwrap();
        assert_eq!(entry.temperature_c, Some(dec("-12.25")));
    }

    #[test]
    fn submission_deserializes_with_defaults() {
        let machine_id = MachineId::new();
        let s: NewProductionEntry = serde_json::from_value(serde_json::json!({
            "machine_id": machine_id.to_string(),
            "detail_name": "Shaft",
            "parts_made": 5,
            "temperature_c": "60.5",
            "vibration_mm": 1.25,
        }))
        .unwrap();
        assert_eq!(s.defective_parts, 0);
        assert_eq!(s.temperature_c, Some(dec("60.5")));
        assert_eq!(s.tool_wear_percent, None);
        assert!(s.shift.is_empty());
    }

    proptest! {
        #[test]
        fn accepted_measurements_keep_their_column_scale(
            temp in -99_999i64..=99_999,
            vib in 0i64..100_000,
        ) {
            let mut s = submission();
            s.temperature_c = Some(Decimal::new(temp, 2));
            s.vibration_mm = Some(Decimal::new(vib, 3));
            let entry = s
                .validate(ProductionEntryId::new(), UserId::new(), Utc::now())
                .unwrap();
            prop_assert_eq!(entry.temperature_c.unwrap().scale(), 2);
            prop_assert_eq!(entry.temperature_c, Some(Decimal::new(temp, 2)));
            prop_assert_eq!(entry.vibration_mm.unwrap().scale(), 3);
        }
    }

    #[test]
    fn worker_label_falls_back_to_the_id() {
        let worker = UserId::new();
        let entry = submission()
            .validate(ProductionEntryId::new(), worker, Utc::now())
            .unwrap();
        assert_eq!(entry.worker_label(), worker.to_string());

        let named = entry.with_worker_name("  Anna Petrova ");
        assert_eq!(named.worker_name, "Anna Petrova");
        assert_eq!(named.worker_label(), "Anna Petrova");
        assert_eq!(named.clone().with_worker_name(&"x".repeat(200)).worker_name.len(), 150);
    }

    #[test]
    fn missing_measurement_is_unmeasured() {
        let mut s = submission();
        s.vibration_mm = None;
        let entry = s
            .validate(ProductionEntryId::new(), UserId::new(), Utc::now())
            .unwrap();
        assert!(!entry.is_measured());
    }
}
