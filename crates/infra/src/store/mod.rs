//! Storage boundary for tools, defect reports and the production log.
//!
//! Domain crates never see this module; the stock ledger and the production
//! log service are the only callers.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryProductionStore, InMemoryToolStore};
pub use postgres::{PostgresProductionStore, PostgresToolStore, ensure_schema};
pub use r#trait::{DefectReportQuery, ProductionStore, StoreError, ToolStore};
