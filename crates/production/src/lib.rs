//! Production log domain module.
//!
//! Workers record what they produced on which machine, optionally with process
//! measurements; managers review the measured entries as process rows and
//! every entry as employee rows.

pub mod employee;
pub mod entry;
pub mod machine;
pub mod process;

pub use employee::{EmployeeRow, employee_rows};
pub use entry::{NewProductionEntry, ProductionEntry};
pub use machine::{Machine, NewMachine};
pub use process::{ProcessReport, ProcessRow, process_rows};
