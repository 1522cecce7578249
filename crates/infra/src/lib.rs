//! Infrastructure layer: stores (in-memory and Postgres), the stock ledger
//! and the production log service.

pub mod ledger;
pub mod production_log;
pub mod store;

pub use ledger::{LedgerError, StockLedger};
pub use production_log::ProductionLog;
