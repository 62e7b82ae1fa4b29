//! Explicit dashboard state.
//!
//! A `Session` bundles the loaded table with the options chosen by the user.
//! Every interaction produces a new `Session` value (the loaded table is shared
//! behind an `Arc`, so this is cheap) and the summaries are recomputed from it.

use std::sync::Arc;

use crate::aggregate::aggregate;
use crate::domain::{AggregationConfig, FilterSet, Granularity, NEW_WINDOW_MAX, NEW_WINDOW_MIN, PeriodSummary, SaleRecord};
use crate::io::ingest::SalesTable;

#[derive(Debug, Clone)]
pub struct Session {
    table: Arc<SalesTable>,
    config: AggregationConfig,
    filters: FilterSet,
}

impl Session {
    pub fn new(table: SalesTable, config: AggregationConfig, filters: FilterSet) -> Self {
        Self {
            table: Arc::new(table),
            config,
            filters,
        }
    }

    pub fn table(&self) -> &SalesTable {
        &self.table
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Replace the loaded table, keeping options. Filters on columns the new
    /// table lacks are dropped.
    pub fn with_table(&self, table: SalesTable) -> Self {
        let mut filters = self.filters.clone();
        let stale: Vec<String> = filters
            .iter()
            .filter(|(column, _)| !table.attribute_columns.iter().any(|c| c == column))
            .map(|(column, _)| column.to_string())
            .collect();
        for column in stale {
            filters = filters.without(&column);
        }
        Self {
            table: Arc::new(table),
            config: self.config.clone(),
            filters,
        }
    }

    pub fn with_config(&self, config: AggregationConfig) -> Self {
        Self {
            table: Arc::clone(&self.table),
            config,
            filters: self.filters.clone(),
        }
    }

    pub fn with_filters(&self, filters: FilterSet) -> Self {
        Self {
            table: Arc::clone(&self.table),
            config: self.config.clone(),
            filters,
        }
    }

    pub fn with_granularity(&self, granularity: Granularity) -> Self {
        self.with_config(AggregationConfig {
            granularity,
            ..self.config.clone()
        })
    }

    pub fn with_include_aux(&self, include_aux_surface: bool) -> Self {
        self.with_config(AggregationConfig {
            include_aux_surface,
            ..self.config.clone()
        })
    }

    pub fn with_pre_year(&self, pre_1990_threshold: i32) -> Self {
        self.with_config(AggregationConfig {
            pre_1990_threshold,
            ..self.config.clone()
        })
    }

    /// Window is clamped to the supported range.
    pub fn with_new_window(&self, window: u32) -> Self {
        self.with_config(AggregationConfig {
            new_years_window: window.clamp(NEW_WINDOW_MIN, NEW_WINDOW_MAX),
            ..self.config.clone()
        })
    }

    /// Records passing the active filters.
    pub fn filtered_records(&self) -> impl Iterator<Item = &SaleRecord> {
        self.table.records.iter().filter(|r| self.filters.matches(r))
    }

    pub fn summaries(&self) -> Vec<PeriodSummary> {
        aggregate(self.filtered_records(), &self.config)
    }
}
