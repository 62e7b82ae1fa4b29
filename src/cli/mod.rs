//! Command-line parsing for the house sales trends dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the ingest/aggregation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    AggregationConfig, ColumnNames, DEFAULT_AUX_AREA_COLUMN, DEFAULT_BUILT_COLUMN, DEFAULT_DATE_COLUMN,
    DEFAULT_MAIN_AREA_COLUMN, DEFAULT_NEW_WINDOW, DEFAULT_PRE_YEAR, FilterSet, Granularity, NEW_WINDOW_MAX,
    NEW_WINDOW_MIN,
};
use crate::error::AppError;
use crate::plot::Metric;

pub mod picker;

use picker::YearSelection;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "trends",
    version,
    about = "Greece house sales trends: volume, traded surface and old/new mix by month/quarter/year"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the aggregated table (or JSON) for the selected files.
    Summary(SummaryArgs),
    /// Write the aggregated table to a CSV file.
    Export(ExportArgs),
    /// List the bundled yearly files.
    Files(FilesArgs),
    /// Launch the interactive dashboard.
    ///
    /// Options set here are the initial dashboard state; everything except the
    /// file selection can be changed interactively.
    Tui(RunArgs),
}

/// Where to read sale records from.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Spreadsheet to load (.xlsx/.xls/.ods/.csv). Repeat to combine files.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Directory of bundled yearly files (year embedded in the file name).
    #[arg(long, env = "TRENDS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Bundled year to load. Repeat to load several years.
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<i32>,

    /// First bundled year of a range (inclusive).
    #[arg(long = "from", value_name = "YEAR", conflicts_with = "years")]
    pub from_year: Option<i32>,

    /// Last bundled year of a range (inclusive).
    #[arg(long = "to", value_name = "YEAR", conflicts_with = "years")]
    pub to_year: Option<i32>,
}

impl SourceArgs {
    pub fn year_selection(&self) -> YearSelection {
        if !self.years.is_empty() {
            return YearSelection::Years(self.years.clone());
        }
        if self.from_year.is_some() || self.to_year.is_some() {
            return YearSelection::Range {
                from: self.from_year,
                to: self.to_year,
            };
        }
        YearSelection::All
    }
}

/// Aggregation, column and filter options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct AggregateArgs {
    /// Time aggregation.
    #[arg(short = 'g', long, value_enum, default_value_t = Granularity::Month)]
    pub granularity: Granularity,

    /// Include auxiliary area in the traded surface total.
    #[arg(long)]
    pub include_aux: bool,

    /// Properties built before this year are counted as old.
    #[arg(long, default_value_t = DEFAULT_PRE_YEAR)]
    pub pre_year: i32,

    /// A property is new if built within N years of its sale.
    #[arg(long, default_value_t = DEFAULT_NEW_WINDOW)]
    pub new_window: u32,

    /// Sale date column.
    #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
    pub date_col: String,

    /// Year built column.
    #[arg(long, default_value = DEFAULT_BUILT_COLUMN)]
    pub built_col: String,

    /// Main area column (sqm).
    #[arg(long, default_value = DEFAULT_MAIN_AREA_COLUMN)]
    pub main_area_col: String,

    /// Auxiliary area column (sqm), optional in the file.
    #[arg(long, default_value = DEFAULT_AUX_AREA_COLUMN)]
    pub aux_area_col: String,

    /// Keep only rows where COLUMN equals VALUE. Repeat to combine.
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,
}

impl Default for AggregateArgs {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            include_aux: false,
            pre_year: DEFAULT_PRE_YEAR,
            new_window: DEFAULT_NEW_WINDOW,
            date_col: DEFAULT_DATE_COLUMN.to_string(),
            built_col: DEFAULT_BUILT_COLUMN.to_string(),
            main_area_col: DEFAULT_MAIN_AREA_COLUMN.to_string(),
            aux_area_col: DEFAULT_AUX_AREA_COLUMN.to_string(),
            filters: Vec::new(),
        }
    }
}

impl AggregateArgs {
    pub fn aggregation_config(&self) -> Result<AggregationConfig, AppError> {
        if !(NEW_WINDOW_MIN..=NEW_WINDOW_MAX).contains(&self.new_window) {
            return Err(AppError::input(format!(
                "--new-window must be between {NEW_WINDOW_MIN} and {NEW_WINDOW_MAX} (got {}).",
                self.new_window
            )));
        }
        Ok(AggregationConfig {
            granularity: self.granularity,
            include_aux_surface: self.include_aux,
            pre_1990_threshold: self.pre_year,
            new_years_window: self.new_window,
        })
    }

    pub fn column_names(&self) -> ColumnNames {
        ColumnNames {
            date: self.date_col.clone(),
            year_built: self.built_col.clone(),
            main_area: self.main_area_col.clone(),
            aux_area: self.aux_area_col.clone(),
        }
    }

    pub fn filter_set(&self) -> Result<FilterSet, AppError> {
        let mut filters = FilterSet::new();
        for expr in &self.filters {
            let (column, value) = FilterSet::parse_expr(expr).map_err(AppError::input)?;
            filters = filters.with(column, value);
        }
        Ok(filters)
    }
}

/// Options common to every data-consuming command.
#[derive(Debug, Args, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub aggregate: AggregateArgs,
}

/// Options for `trends summary`.
#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Print JSON instead of a text table.
    #[arg(long)]
    pub json: bool,

    /// Append an ASCII bar chart of sales per period.
    #[arg(long)]
    pub plot: bool,

    /// Value charted by --plot.
    #[arg(long, value_enum, default_value_t = Metric::Sales)]
    pub plot_metric: Metric,

    /// Width of the ASCII chart bars (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,
}

/// Options for `trends export`.
#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Output CSV path.
    #[arg(short, long, value_name = "CSV", default_value = crate::io::DEFAULT_EXPORT_NAME)]
    pub out: PathBuf,
}

/// Options for `trends files`.
#[derive(Debug, Args)]
pub struct FilesArgs {
    /// Directory of bundled yearly files.
    #[arg(long, env = "TRENDS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_summary_options() {
        let cli = Cli::try_parse_from([
            "trends",
            "summary",
            "-f",
            "a.xlsx",
            "-g",
            "quarter",
            "--include-aux",
            "--pre-year",
            "1985",
            "--filter",
            "Νομαρχία=ΑΤΤΙΚΗΣ",
            "--json",
        ])
        .unwrap();

        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert!(args.json);
        assert_eq!(args.plot_metric, Metric::Sales);
        assert_eq!(args.run.source.files, vec![PathBuf::from("a.xlsx")]);
        let config = args.run.aggregate.aggregation_config().unwrap();
        assert_eq!(config.granularity, Granularity::Quarter);
        assert!(config.include_aux_surface);
        assert_eq!(config.pre_1990_threshold, 1985);
        assert_eq!(config.new_years_window, 5);
        let filters = args.run.aggregate.filter_set().unwrap();
        assert_eq!(filters.get("Νομαρχία"), Some("ΑΤΤΙΚΗΣ"));
        assert_eq!(args.run.aggregate.column_names(), ColumnNames::default());
    }

    #[test]
    fn plot_metric_accepts_sqm() {
        let cli = Cli::try_parse_from(["trends", "summary", "--plot", "--plot-metric", "sqm"]).unwrap();
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert!(args.plot);
        assert_eq!(args.plot_metric, Metric::TradedSqm);
        assert!(Cli::try_parse_from(["trends", "summary", "--plot-metric", "price"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_window() {
        let args = AggregateArgs {
            new_window: 0,
            ..AggregateArgs::default()
        };
        assert!(args.aggregation_config().is_err());
    }

    #[test]
    fn year_selection_from_args() {
        let cli = Cli::try_parse_from(["trends", "tui", "--from", "2020", "--to", "2022"]).unwrap();
        let Command::Tui(args) = cli.command else {
            panic!("expected tui");
        };
        assert_eq!(
            args.source.year_selection(),
            YearSelection::Range {
                from: Some(2020),
                to: Some(2022)
            }
        );
        assert!(Cli::try_parse_from(["trends", "tui", "--year", "2020", "--from", "2019"]).is_err());
    }
}
