//! Sparse change sets for partial (PATCH-style) tool updates.
//!
//! A change set names only the fields a caller wants to change. Keys are
//! resolved into [`ToolField`] once, at the envelope boundary; values stay raw
//! (as received from a form or JSON body) until the validation engine coerces
//! them.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Fields of a tool that a partial update may touch.
///
/// Declaration order is the order in which fields are validated and in which
/// field errors are reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolField {
    Stock,
    DefectiveStock,
    MinThreshold,
    AvgDailyOutflow,
    Location,
}

impl ToolField {
    pub const ALL: [ToolField; 5] = [
        ToolField::Stock,
        ToolField::DefectiveStock,
        ToolField::MinThreshold,
        ToolField::AvgDailyOutflow,
        ToolField::Location,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolField::Stock => "stock",
            ToolField::DefectiveStock => "defective_stock",
            ToolField::MinThreshold => "min_threshold",
            ToolField::AvgDailyOutflow => "avg_daily_outflow",
            ToolField::Location => "location",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }
}

impl core::fmt::Display for ToolField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value exactly as the caller sent it, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    /// A JSON number, kept as its literal text so no precision is lost.
    Number(String),
    Bool(bool),
    /// Arrays and objects; never a valid field value, kept for error reporting.
    Composite(JsonValue),
}

impl From<JsonValue> for RawValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RawValue::Null,
            JsonValue::String(s) => RawValue::Text(s),
            JsonValue::Number(n) => RawValue::Number(n.to_string()),
            JsonValue::Bool(b) => RawValue::Bool(b),
            other => RawValue::Composite(other),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value.to_string())
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// The change-set envelope itself could not be understood.
///
/// Distinct from field-level errors: it is raised before any field is looked at.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRequest {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Sparse set of proposed changes for one tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: BTreeMap<ToolField, RawValue>,
    ignored: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; a later value for the same field replaces the earlier one.
    pub fn with(mut self, field: ToolField, value: impl Into<RawValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: ToolField, value: impl Into<RawValue>) {
        self.changes.insert(field, value.into());
    }

    pub fn get(&self, field: ToolField) -> Option<&RawValue> {
        self.changes.get(&field)
    }

    pub fn contains(&self, field: ToolField) -> bool {
        self.changes.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = ToolField> + '_ {
        self.changes.keys().copied()
    }

    /// Keys present in the request that do not name an updatable field.
    ///
    /// They are dropped without error.
    pub fn ignored_keys(&self) -> &[String] {
        &self.ignored
    }

    /// Parse a raw request body. An empty body is an empty change set.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, MalformedRequest> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let value: JsonValue = serde_json::from_slice(body)
            .map_err(|e| MalformedRequest::InvalidJson(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn from_json(value: JsonValue) -> Result<Self, MalformedRequest> {
        let object = match value {
            JsonValue::Object(map) => map,
            JsonValue::Null => return Err(MalformedRequest::NotAnObject("null")),
            JsonValue::Bool(_) => return Err(MalformedRequest::NotAnObject("a boolean")),
            JsonValue::Number(_) => return Err(MalformedRequest::NotAnObject("a number")),
            JsonValue::String(_) => return Err(MalformedRequest::NotAnObject("a string")),
            JsonValue::Array(_) => return Err(MalformedRequest::NotAnObject("an array")),
        };

        let mut set = Self::new();
        for (key, value) in object {
            match ToolField::from_key(&key) {
                Some(field) => set.set(field, RawValue::from(value)),
                None => set.ignored.push(key),
            }
        }

        if !set.ignored.is_empty() {
            tracing::debug!(ignored = ?set.ignored, "dropping unrecognized tool update keys");
        }

        Ok(set)
    }
}
