//! Shared "load + aggregate" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve sources -> read sheets -> validate filters -> build session
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::app::state::Session;
use crate::cli::picker::{BundledFile, YearSelection, discover_bundled, select_bundled, validate_spreadsheet_path};
use crate::cli::{AggregateArgs, RunArgs};
use crate::domain::{AggregationConfig, FilterSet, FILTER_COLUMNS};
use crate::error::AppError;
use crate::io::ingest::{IngestOptions, SalesTable, load_sales};

/// Resolved list of files to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePlan {
    /// Explicit files given by the user.
    Files(Vec<PathBuf>),
    /// Bundled yearly files.
    Bundled {
        available: Vec<BundledFile>,
        selected: Vec<BundledFile>,
    },
}

impl SourcePlan {
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            SourcePlan::Files(files) => files.clone(),
            SourcePlan::Bundled { selected, .. } => selected.iter().map(|f| f.path.clone()).collect(),
        }
    }
}

/// How to behave when neither files nor bundled data are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Ask on stdin (text commands).
    Prompt,
    /// Fail with a message (the TUI owns the terminal).
    Fail,
}

/// Decide which files to read from CLI source options.
pub fn plan_sources(args: &RunArgs, fallback: Fallback) -> Result<SourcePlan, AppError> {
    let source = &args.source;
    if !source.files.is_empty() {
        let files = source
            .files
            .iter()
            .map(|p| validate_spreadsheet_path(p))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(SourcePlan::Files(files));
    }

    let selection = source.year_selection();
    let available = if source.data_dir.is_dir() {
        discover_bundled(&source.data_dir)?
    } else {
        Vec::new()
    };

    if available.is_empty() {
        if selection != YearSelection::All {
            return Err(AppError::no_data(format!(
                "No bundled yearly files found in '{}'.",
                source.data_dir.display()
            )));
        }
        return match fallback {
            Fallback::Prompt => Ok(SourcePlan::Files(vec![crate::cli::picker::prompt_for_path()?])),
            Fallback::Fail => Err(AppError::input(format!(
                "No input: pass -f <file.xlsx> or put yearly files in '{}'.",
                source.data_dir.display()
            ))),
        };
    }

    let selected = select_bundled(&available, &selection);
    if selected.is_empty() {
        let years: Vec<String> = available.iter().map(|f| f.year.to_string()).collect();
        return Err(AppError::no_data(format!(
            "No bundled file matches the selected years. Available: {}",
            years.join(", ")
        )));
    }

    Ok(SourcePlan::Bundled { available, selected })
}

/// Ingest options derived from CLI column names and filters.
pub fn ingest_options(args: &AggregateArgs, filters: &FilterSet) -> IngestOptions {
    let mut attribute_columns: Vec<String> = FILTER_COLUMNS.iter().map(|c| c.to_string()).collect();
    for (column, _) in filters.iter() {
        if !attribute_columns.iter().any(|c| c == column) {
            attribute_columns.push(column.to_string());
        }
    }
    IngestOptions {
        columns: args.column_names(),
        attribute_columns,
    }
}

/// Read every file (in parallel) and concatenate in the given order.
pub fn load_all(paths: &[PathBuf], options: &IngestOptions) -> Result<SalesTable, AppError> {
    let tables = paths
        .par_iter()
        .map(|path| load_sales(path, options))
        .collect::<Result<Vec<_>, _>>()?;
    let table = SalesTable::concat(tables);
    info!(
        sources = table.sources.len(),
        rows_used = table.rows_used(),
        rows_skipped = table.rows_skipped(),
        "sales table ready"
    );
    Ok(table)
}

/// Every filter must name a column present in the loaded data.
pub fn validate_filters(table: &SalesTable, filters: &FilterSet) -> Result<(), AppError> {
    for (column, _) in filters.iter() {
        if !table.attribute_columns.iter().any(|c| c == column) {
            return Err(AppError::input(format!(
                "Filter column '{column}' not found. Available filter columns: {}",
                if table.attribute_columns.is_empty() {
                    "(none)".to_string()
                } else {
                    table.attribute_columns.join(", ")
                }
            )));
        }
    }
    Ok(())
}

/// All outputs needed to start a command.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub plan: SourcePlan,
    pub options: IngestOptions,
    pub session: Session,
}

/// Resolve sources, read them and build the initial session.
pub fn load_session(args: &RunArgs, fallback: Fallback) -> Result<Loaded, AppError> {
    let config: AggregationConfig = args.aggregate.aggregation_config()?;
    let filters = args.aggregate.filter_set()?;
    let plan = plan_sources(args, fallback)?;
    let options = ingest_options(&args.aggregate, &filters);

    debug!(?plan, ?config, "loading sources");
    let table = load_all(&plan.paths(), &options)?;
    validate_filters(&table, &filters)?;

    Ok(Loaded {
        plan,
        options,
        session: Session::new(table, config, filters),
    })
}
