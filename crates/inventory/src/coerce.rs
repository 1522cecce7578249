//! Raw value → typed field coercion.
//!
//! Every helper returns an explicit per-field result; none of them panic or
//! short-circuit the caller, so the validation engine can aggregate errors.

use core::num::IntErrorKind;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value as JsonValue;

use crate::change::RawValue;
use crate::tool::LOCATION_MAX_LEN;
use crate::validate::FieldErrorKind;

/// Fractional digits stored for `avg_daily_outflow`.
pub const OUTFLOW_SCALE: u32 = 2;

/// Exclusive upper bound for `avg_daily_outflow` (six digits, two fractional).
pub fn outflow_limit() -> Decimal {
    Decimal::new(10_000, 0)
}

/// Coerce a stock counter. `null` and `""` are rejected.
pub fn count(raw: &RawValue) -> Result<u32, FieldErrorKind> {
    match raw {
        RawValue::Null => Err(FieldErrorKind::Empty),
        RawValue::Text(s) if s.is_empty() => Err(FieldErrorKind::Empty),
        RawValue::Text(s) => parse_count_text(s.trim()),
        RawValue::Number(n) => parse_count_number(n),
        RawValue::Bool(_) | RawValue::Composite(_) => Err(FieldErrorKind::NotANumber),
    }
}

/// Coerce the daily outflow rate. `null` and `""` clear it.
pub fn outflow(raw: &RawValue) -> Result<Option<Decimal>, FieldErrorKind> {
    let text = match raw {
        RawValue::Null => return Ok(None),
        RawValue::Text(s) if s.is_empty() => return Ok(None),
        RawValue::Text(s) => s.trim(),
        RawValue::Number(n) => n.as_str(),
        RawValue::Bool(_) | RawValue::Composite(_) => return Err(FieldErrorKind::NotANumber),
    };
    let Some(value) = parse_decimal(text) else {
        return match numeric_literal(text) {
            Some(v) if v.is_sign_negative() && v != 0.0 => Err(FieldErrorKind::Negative),
            Some(v) if v >= 1.0 => Err(outflow_too_large()),
            // Far below a cent.
            Some(_) => Ok(Some(Decimal::new(0, OUTFLOW_SCALE))),
            None => Err(FieldErrorKind::NotANumber),
        };
    };
    normalize_outflow(value).map(Some)
}

/// Coerce a storage location.
///
/// Empty-ish values (`null`, `false`, zero, `[]`, `{}`) store as `""`; any
/// other non-string is rendered as its JSON text.
pub fn location(raw: &RawValue) -> Result<String, FieldErrorKind> {
    let text = match raw {
        RawValue::Null | RawValue::Bool(false) => String::new(),
        RawValue::Text(s) => s.clone(),
        RawValue::Number(n) if is_zero_literal(n) => String::new(),
        RawValue::Number(n) => n.clone(),
        RawValue::Bool(true) => "true".to_string(),
        RawValue::Composite(JsonValue::Array(items)) if items.is_empty() => String::new(),
        RawValue::Composite(JsonValue::Object(map)) if map.is_empty() => String::new(),
        RawValue::Composite(v) => v.to_string(),
    };
    if text.chars().count() > LOCATION_MAX_LEN {
        return Err(FieldErrorKind::TooLong { max: LOCATION_MAX_LEN });
    }
    Ok(text)
}

/// Range-check an outflow rate and round it half-even to two fractional digits.
pub fn normalize_outflow(value: Decimal) -> Result<Decimal, FieldErrorKind> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FieldErrorKind::Negative);
    }
    let mut rounded =
        value.round_dp_with_strategy(OUTFLOW_SCALE, RoundingStrategy::MidpointNearestEven);
    if rounded >= outflow_limit() {
        return Err(outflow_too_large());
    }
    rounded.rescale(OUTFLOW_SCALE);
    // "-0" and friends collapse to a plain zero.
    rounded.set_sign_positive(true);
    Ok(rounded)
}

/// Parse plain (`"4.5"`) or scientific (`"4.5e1"`) decimal text.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

fn parse_count_text(text: &str) -> Result<u32, FieldErrorKind> {
    match text.parse::<i64>() {
        Ok(v) => bounded_count(v),
        Err(e) => match e.kind() {
            IntErrorKind::NegOverflow => Err(FieldErrorKind::Negative),
            IntErrorKind::PosOverflow => Err(too_large_count()),
            _ => Err(FieldErrorKind::NotANumber),
        },
    }
}

/// JSON numbers may arrive as `15` or `15.0`; both are fine, `1.5` is not.
fn parse_count_number(literal: &str) -> Result<u32, FieldErrorKind> {
    if let Ok(v) = literal.parse::<i64>() {
        return bounded_count(v);
    }
    let Some(value) = parse_decimal(literal) else {
        return match numeric_literal(literal) {
            Some(v) if v.is_sign_negative() && v != 0.0 => Err(FieldErrorKind::Negative),
            Some(v) if v.fract() != 0.0 => Err(FieldErrorKind::NotWhole),
            Some(_) => Err(too_large_count()),
            None => Err(FieldErrorKind::NotANumber),
        };
    };
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FieldErrorKind::Negative);
    }
    if !value.fract().is_zero() {
        return Err(FieldErrorKind::NotWhole);
    }
    value.to_u32().ok_or_else(too_large_count)
}

fn bounded_count(value: i64) -> Result<u32, FieldErrorKind> {
    if value < 0 {
        return Err(FieldErrorKind::Negative);
    }
    u32::try_from(value).map_err(|_| too_large_count())
}

/// A plain or scientific numeric literal outside `Decimal`'s range (`1e30`,
/// `1e-40`). Words such as `inf` or `NaN` are not numeric literals.
fn numeric_literal(text: &str) -> Option<f64> {
    let numeric = !text.is_empty()
        && text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !numeric {
        return None;
    }
    text.parse::<f64>().ok()
}

fn is_zero_literal(literal: &str) -> bool {
    parse_decimal(literal).is_some_and(|d| d.is_zero())
        || numeric_literal(literal).is_some_and(|v| v == 0.0)
}

fn outflow_too_large() -> FieldErrorKind {
    FieldErrorKind::TooLarge {
        max: "9999.99".to_string(),
    }
}

fn too_large_count() -> FieldErrorKind {
    FieldErrorKind::TooLarge {
        max: u32::MAX.to_string(),
    }
}
