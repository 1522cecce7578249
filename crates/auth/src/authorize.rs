use thiserror::Error;

use crate::permissions::{
    DEFECTS_READ_ALL, DEFECTS_READ_OWN, DEFECTS_REPORT, INVENTORY_READ, INVENTORY_REGISTER,
    INVENTORY_UPDATE, MACHINES_REGISTER, PRODUCTION_READ_OWN, PRODUCTION_RECORD,
    PRODUCTION_REVIEW,
};
use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks permission '{permission}'")]
    Forbidden { role: Role, permission: String },
}

/// Static role → permission policy.
///
/// Managers never report defects or log production; workers never edit
/// inventory. The two sets are disjoint.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    static MANAGER: [Permission; 6] = [
        INVENTORY_READ,
        INVENTORY_REGISTER,
        INVENTORY_UPDATE,
        DEFECTS_READ_ALL,
        PRODUCTION_REVIEW,
        MACHINES_REGISTER,
    ];
    static WORKER: [Permission; 4] = [
        DEFECTS_REPORT,
        DEFECTS_READ_OWN,
        PRODUCTION_RECORD,
        PRODUCTION_READ_OWN,
    ];

    match role {
        Role::Manager => &MANAGER,
        Role::Worker => &WORKER,
    }
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if role_permissions(principal.role).contains(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role,
            permission: required.as_str().to_string(),
        })
    }
}
