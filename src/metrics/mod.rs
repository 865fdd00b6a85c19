//! Training metrics with a fixed schema.

pub mod update_report;

pub use update_report::{UpdateReport, UpdateStatus};
