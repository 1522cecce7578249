use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "inventory.tools.update").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const INVENTORY_READ: Permission = Permission::from_static("inventory.tools.read");
pub const INVENTORY_REGISTER: Permission = Permission::from_static("inventory.tools.register");
pub const INVENTORY_UPDATE: Permission = Permission::from_static("inventory.tools.update");
pub const DEFECTS_REPORT: Permission = Permission::from_static("defects.report");
pub const DEFECTS_READ_OWN: Permission = Permission::from_static("defects.read_own");
pub const DEFECTS_READ_ALL: Permission = Permission::from_static("defects.read_all");
pub const PRODUCTION_RECORD: Permission = Permission::from_static("production.entries.record");
pub const PRODUCTION_READ_OWN: Permission = Permission::from_static("production.entries.read_own");
pub const PRODUCTION_REVIEW: Permission = Permission::from_static("production.review");
pub const MACHINES_REGISTER: Permission = Permission::from_static("production.machines.register");
