//! API-side authorization guard.
//!
//! Handlers call this before touching the ledger, keeping the domain and
//! infra crates auth-agnostic.

use shopfloor_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check that the request's principal holds `permission`.
pub fn authorize_request(
    principal: &PrincipalContext,
    permission: &Permission,
) -> Result<(), AuthzError> {
    let result = authorize(principal.principal(), permission);
    if let Err(e) = &result {
        tracing::debug!(user_id = %principal.user_id(), error = %e, "request denied");
    }
    result
}
