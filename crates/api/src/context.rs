use shopfloor_auth::{Principal, Role};
use shopfloor_core::UserId;

/// Principal context for a request (identity forwarded by the gateway).
///
/// Inserted by the identity middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
    display_name: Option<String>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            principal: Principal::new(user_id, role),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Human-readable name, when the gateway forwarded one.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
