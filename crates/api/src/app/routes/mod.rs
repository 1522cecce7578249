use axum::{Router, routing::get};

pub mod defects;
pub mod inventory;
pub mod production;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/inventory", inventory::router())
        .nest("/defects", defects::router())
        .nest("/production", production::router())
}
