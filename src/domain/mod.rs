//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - aggregation options (`Granularity`, `AggregationConfig`)
//! - parsed sale rows (`SaleRecord`) and drill-down filters (`FilterSet`)
//! - aggregation outputs (`PeriodKey`, `PeriodSummary`, `AgeBucket`)

pub mod types;

pub use types::*;
