//! `shopfloor-auth`: role-based authorization boundary.
//!
//! Authentication happens upstream; this crate only decides what an already
//! identified principal may do. It is decoupled from HTTP and storage.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize, role_permissions};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
