//! Payroll entries keyed by employee and month.

pub mod entry;
pub mod period;

pub use entry::PayrollEntry;
pub use period::Period;
