use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfloor_core::{DomainError, DomainResult, Entity, ToolId};

use crate::coerce;

/// Longest accepted tool name, in characters.
pub const NAME_MAX_LEN: usize = 180;

/// Longest accepted storage location, in characters.
pub const LOCATION_MAX_LEN: usize = 160;

/// The mutable slice of a [`Tool`]: everything a manager may overwrite.
///
/// The validation engine maps one `ToolState` to another; the stock ledger
/// persists the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolState {
    pub stock: u32,
    pub defective_stock: u32,
    pub min_threshold: u32,
    pub location: String,
    /// Fixed-point rate with two fractional digits; `None` means unknown.
    pub avg_daily_outflow: Option<Decimal>,
}

/// Inventory record for one distinct tool.
///
/// `defective_stock` is conceptually a subset of `stock`, but nothing enforces
/// `defective_stock <= stock`: manager edits and defect reports may leave the
/// counters in either order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub stock: u32,
    pub defective_stock: u32,
    pub min_threshold: u32,
    pub location: String,
    pub avg_daily_outflow: Option<Decimal>,
    pub last_updated_at: DateTime<Utc>,
}

impl Entity for Tool {
    type Id = ToolId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Tool {
    pub fn state(&self) -> ToolState {
        ToolState {
            stock: self.stock,
            defective_stock: self.defective_stock,
            min_threshold: self.min_threshold,
            location: self.location.clone(),
            avg_daily_outflow: self.avg_daily_outflow,
        }
    }

    /// Overwrite every mutable field with `state` (replace path).
    pub fn replace_state(&mut self, state: ToolState, at: DateTime<Utc>) {
        self.stock = state.stock;
        self.defective_stock = state.defective_stock;
        self.min_threshold = state.min_threshold;
        self.location = state.location;
        self.avg_daily_outflow = state.avg_daily_outflow;
        self.last_updated_at = at;
    }

    /// Add newly discovered defective units (increment path).
    ///
    /// Leaves the tool untouched when the counter would overflow.
    pub fn record_defect(&mut self, defective_count: u32, at: DateTime<Utc>) -> DomainResult<()> {
        if defective_count == 0 {
            return Err(DomainError::validation("defective_count must be positive"));
        }
        let next = self
            .defective_stock
            .checked_add(defective_count)
            .ok_or_else(|| DomainError::invariant("defective_stock would overflow"))?;
        self.defective_stock = next;
        self.last_updated_at = at;
        Ok(())
    }
}

/// Request to register a tool ahead of time (seeding / manager registration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTool {
    pub name: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub defective_stock: u32,
    #[serde(default)]
    pub min_threshold: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub avg_daily_outflow: Option<Decimal>,
}

impl NewTool {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stock: 0,
            defective_stock: 0,
            min_threshold: 0,
            location: String::new(),
            avg_daily_outflow: None,
        }
    }

    /// Check the registration request and normalize it (trimmed name, outflow
    /// rounded to two places). Name uniqueness is checked by the store.
    pub fn validate(mut self) -> DomainResult<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if name.chars().count() > NAME_MAX_LEN {
            return Err(DomainError::validation(format!(
                "name must be at most {NAME_MAX_LEN} characters"
            )));
        }
        self.name = name.to_string();

        if self.location.chars().count() > LOCATION_MAX_LEN {
            return Err(DomainError::validation(format!(
                "location must be at most {LOCATION_MAX_LEN} characters"
            )));
        }

        if let Some(rate) = self.avg_daily_outflow {
            let normalized = coerce::normalize_outflow(rate)
                .map_err(|kind| DomainError::validation(format!("avg_daily_outflow {kind}")))?;
            self.avg_daily_outflow = Some(normalized);
        }

        Ok(self)
    }

    pub fn into_tool(self, id: ToolId, at: DateTime<Utc>) -> Tool {
        Tool {
            id,
            name: self.name,
            stock: self.stock,
            defective_stock: self.defective_stock,
            min_threshold: self.min_threshold,
            location: self.location,
            avg_daily_outflow: self.avg_daily_outflow,
            last_updated_at: at,
        }
    }
}
