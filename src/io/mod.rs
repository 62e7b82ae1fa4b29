//! Input/output helpers.
//!
//! - spreadsheet ingest + validation (`ingest`)
//! - summary exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
