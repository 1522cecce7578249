//! Inventory domain module: tools, partial updates and defect reports.
//!
//! This crate contains the business rules for tool inventory, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage). Persisting the
//! results is the job of the stock ledger in `shopfloor-infra`.

pub mod change;
pub mod coerce;
pub mod defect;
pub mod tool;
pub mod validate;
pub mod view;

pub use change::{ChangeSet, MalformedRequest, RawValue, ToolField};
pub use defect::{DefectReport, NewDefectReport};
pub use tool::{NewTool, Tool, ToolState};
pub use validate::{FieldError, FieldErrorKind, FieldErrors, validate_and_apply};
pub use view::ToolView;
