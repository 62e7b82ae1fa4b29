//! Reporting utilities: text tables for aggregated summaries.

pub mod format;

pub use format::{format_run_header, format_summary_table};
