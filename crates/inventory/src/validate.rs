//! Partial-update validation engine.
//!
//! `validate_and_apply` is pure: it never touches storage and never mutates the
//! state it is given. Either every proposed field is valid and a complete
//! replacement state comes back, or the caller gets one error per invalid field.

use thiserror::Error;

use crate::change::{ChangeSet, RawValue, ToolField};
use crate::coerce;
use crate::tool::ToolState;

/// Why a single field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("cannot be empty")]
    Empty,

    #[error("must be a number")]
    NotANumber,

    #[error("must be a whole number")]
    NotWhole,

    #[error("must be non-negative")]
    Negative,

    #[error("must be at most {max}")]
    TooLarge { max: String },

    #[error("must be at most {max} characters")]
    TooLong { max: usize },
}

/// A validation failure attributed to one named field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {kind}")]
pub struct FieldError {
    pub field: ToolField,
    pub kind: FieldErrorKind,
}

/// Every field error of one request, in field order.
///
/// Displays as the individual messages joined by a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Per-field messages, e.g. `"stock must be non-negative"`.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.messages().join(" "))
    }
}

impl std::error::Error for FieldErrors {}

/// Validate `changes` against `current` and build the replacement state.
///
/// Only fields present in `changes` are considered; all others keep their
/// current value. Every field is checked even after an earlier one failed.
pub fn validate_and_apply(current: &ToolState, changes: &ChangeSet) -> Result<ToolState, FieldErrors> {
    let mut errors = Vec::new();

    let stock = resolve(changes, ToolField::Stock, &current.stock, coerce::count, &mut errors);
    let defective_stock = resolve(
        changes,
        ToolField::DefectiveStock,
        &current.defective_stock,
        coerce::count,
        &mut errors,
    );
    let min_threshold = resolve(
        changes,
        ToolField::MinThreshold,
        &current.min_threshold,
        coerce::count,
        &mut errors,
    );
    let avg_daily_outflow = resolve(
        changes,
        ToolField::AvgDailyOutflow,
        &current.avg_daily_outflow,
        coerce::outflow,
        &mut errors,
    );
    let location = resolve(changes, ToolField::Location, &current.location, coerce::location, &mut errors);

    if !errors.is_empty() {
        return Err(FieldErrors(errors));
    }

    Ok(ToolState {
        stock,
        defective_stock,
        min_threshold,
        location,
        avg_daily_outflow,
    })
}

/// Absent field → current value; present field → coerced value or a recorded error.
fn resolve<T: Clone>(
    changes: &ChangeSet,
    field: ToolField,
    current: &T,
    coerce: impl Fn(&RawValue) -> Result<T, FieldErrorKind>,
    errors: &mut Vec<FieldError>,
) -> T {
    let Some(raw) = changes.get(field) else {
        return current.clone();
    };
    match coerce(raw) {
        Ok(value) => value,
        Err(kind) => {
            errors.push(FieldError { field, kind });
            current.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn base() -> ToolState {
        ToolState {
            stock: 10,
            defective_stock: 2,
            min_threshold: 3,
            location: "Rack A".to_string(),
            avg_daily_outflow: Some(Decimal::from_str("4.50").unwrap()),
        }
    }

    #[test]
    fn single_field_update_leaves_the_rest() {
        let changes = ChangeSet::new().with(ToolField::Stock, "15");
        let next = validate_and_apply(&base(), &changes).unwrap();
        assert_eq!(next.stock, 15);
        assert_eq!(next.defective_stock, 2);
        assert_eq!(next.min_threshold, 3);
        assert_eq!(next.location, "Rack A");
        assert_eq!(next.avg_daily_outflow, base().avg_daily_outflow);
    }

    #[test]
    fn errors_are_aggregated_in_field_order() {
        let changes = ChangeSet::from_json(json!({
            "min_threshold": "abc",
            "stock": "-1",
        }))
        .unwrap();
        let current = base();
        let errs = validate_and_apply(&current, &changes).unwrap_err();

        assert_eq!(
            errs.messages(),
            vec![
                "stock must be non-negative".to_string(),
                "min_threshold must be a number".to_string(),
            ]
        );
        assert_eq!(
            errs.to_string(),
            "stock must be non-negative min_threshold must be a number"
        );
        assert_eq!(current, base());
    }

    #[test]
    fn empty_counter_is_an_error_but_empty_outflow_clears() {
        let changes = ChangeSet::new()
            .with(ToolField::DefectiveStock, "")
            .with(ToolField::AvgDailyOutflow, "");
        let errs = validate_and_apply(&base(), &changes).unwrap_err();
        assert_eq!(errs.messages(), vec!["defective_stock cannot be empty".to_string()]);

        let changes = ChangeSet::new().with(ToolField::AvgDailyOutflow, "");
        let next = validate_and_apply(&base(), &changes).unwrap();
        assert_eq!(next.avg_daily_outflow, None);
    }

    #[test]
    fn null_outflow_clears_and_null_location_empties() {
        let changes = ChangeSet::from_json(json!({
            "avg_daily_outflow": null,
            "location": null,
        }))
        .unwrap();
        let next = validate_and_apply(&base(), &changes).unwrap();
        assert_eq!(next.avg_daily_outflow, None);
        assert_eq!(next.location, "");
    }

    #[test]
    fn every_field_can_fail_at_once() {
        let changes = ChangeSet::from_json(json!({
            "stock": null,
            "defective_stock": true,
            "min_threshold": 2.5,
            "avg_daily_outflow": "-3",
            "location": "x".repeat(161),
        }))
        .unwrap();
        let errs = validate_and_apply(&base(), &changes).unwrap_err();
        assert_eq!(
            errs.messages(),
            vec![
                "stock cannot be empty".to_string(),
                "defective_stock must be a number".to_string(),
                "min_threshold must be a whole number".to_string(),
                "avg_daily_outflow must be non-negative".to_string(),
                "location must be at most 160 characters".to_string(),
            ]
        );
    }

    #[test]
    fn defective_stock_may_exceed_stock() {
        // No cross-field check between the two counters.
        let changes = ChangeSet::new()
            .with(ToolField::Stock, "1")
            .with(ToolField::DefectiveStock, "40");
        let next = validate_and_apply(&base(), &changes).unwrap();
        assert_eq!((next.stock, next.defective_stock), (1, 40));
    }

    #[test]
    fn empty_change_set_is_identity() {
        let next = validate_and_apply(&base(), &ChangeSet::new()).unwrap();
        assert_eq!(next, base());
    }

    fn arb_state() -> impl Strategy<Value = ToolState> {
        (
            any::<u32>(),
            any::<u32>(),
            any::<u32>(),
            "[a-zA-Z0-9 ]{0,40}",
            proptest::option::of(0i64..1_000_000i64),
        )
            .prop_map(|(stock, defective_stock, min_threshold, location, cents)| ToolState {
                stock,
                defective_stock,
                min_threshold,
                location,
                avg_daily_outflow: cents.map(|c| Decimal::new(c, 2)),
            })
    }

    fn full_change_set(state: &ToolState) -> ChangeSet {
        ChangeSet::new()
            .with(ToolField::Stock, state.stock.to_string())
            .with(ToolField::DefectiveStock, state.defective_stock.to_string())
            .with(ToolField::MinThreshold, state.min_threshold.to_string())
            .with(ToolField::Location, state.location.clone())
            .with(
                ToolField::AvgDailyOutflow,
                state.avg_daily_outflow.map(|d| d.to_string()),
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            .. ProptestConfig::default()
        })]

        #[test]
        fn absent_fields_are_unchanged(
            current in arb_state(),
            stock in proptest::option::of(any::<u32>()),
            location in proptest::option::of("[a-z]{0,10}"),
        ) {
            let mut changes = ChangeSet::new();
            if let Some(s) = stock {
                changes.set(ToolField::Stock, s.to_string());
            }
            if let Some(l) = &location {
                changes.set(ToolField::Location, l.clone());
            }

            let next = validate_and_apply(&current, &changes).unwrap();
            prop_assert_eq!(next.defective_stock, current.defective_stock);
            prop_assert_eq!(next.min_threshold, current.min_threshold);
            prop_assert_eq!(next.avg_daily_outflow, current.avg_daily_outflow);
            prop_assert_eq!(next.stock, stock.unwrap_or(current.stock));
            prop_assert_eq!(next.location, location.unwrap_or(current.location.clone()));
        }

        #[test]
        fn revalidating_a_full_valid_state_is_identity(state in arb_state()) {
            let next = validate_and_apply(&state, &full_change_set(&state)).unwrap();
            prop_assert_eq!(&next, &state);
            let again = validate_and_apply(&next, &full_change_set(&next)).unwrap();
            prop_assert_eq!(again, next);
        }

        #[test]
        fn one_error_per_invalid_field(
            current in arb_state(),
            bad_stock in any::<bool>(),
            bad_threshold in any::<bool>(),
            bad_outflow in any::<bool>(),
        ) {
            let mut changes = ChangeSet::new().with(ToolField::DefectiveStock, "7");
            if bad_stock {
                changes.set(ToolField::Stock, "-5");
            }
            if bad_threshold {
                changes.set(ToolField::MinThreshold, "lots");
            }
            if bad_outflow {
                changes.set(ToolField::AvgDailyOutflow, "-0.5");
            }
            let expected = [bad_stock, bad_threshold, bad_outflow].iter().filter(|b| **b).count();

            match validate_and_apply(&current, &changes) {
                Ok(next) => {
                    prop_assert_eq!(expected, 0);
                    prop_assert_eq!(next.defective_stock, 7);
                }
                Err(errs) => {
                    prop_assert_eq!(errs.len(), expected);
                    prop_assert!(errs.errors().iter().all(|e| e.field != ToolField::DefectiveStock));
                }
            }
        }
    }
}
