//! `house-trends` library crate.
//!
//! The binary (`trends`) is a thin wrapper around this library so that:
//!
//! - ingest and aggregation are testable without spawning processes
//! - the text commands and the dashboard share one pipeline

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
