use serde::{Deserialize, Serialize};

use shopfloor_core::UserId;

use crate::Role;

/// An identified caller, as forwarded by the authenticating gateway.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}
