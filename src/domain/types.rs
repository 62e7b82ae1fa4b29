//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation
//! - exported to JSON/CSV
//! - rendered by the text report and the TUI

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default header of the contract (sale) date column.
pub const DEFAULT_DATE_COLUMN: &str = "Ημερομηνία Συμβολαίου";
/// Default header of the year-built column.
pub const DEFAULT_BUILT_COLUMN: &str = "Έτος Κατασκευής";
/// Default header of the main surface column.
///
/// The leading `E` is a Latin capital in the published files, not a Greek
/// epsilon; we keep it as-is so the default matches out of the box.
pub const DEFAULT_MAIN_AREA_COLUMN: &str = "Eπιφάνεια Κύριων Χώρων (σε τ.μ.)";
/// Default header of the auxiliary surface column.
pub const DEFAULT_AUX_AREA_COLUMN: &str = "Επιφάνεια Βοηθητικών Χώρων (σε τ.μ.)";

/// Categorical columns offered as drill-down filters when present in a file.
pub const FILTER_COLUMNS: [&str; 4] = [
    "Νομαρχία",
    "Δήμος Καλλικράτη",
    "Δημοτικό ή Κοινοτικό Διαμέρισμα",
    "Κατηγορία Ακινήτου",
];

pub const DEFAULT_PRE_YEAR: i32 = 1990;
pub const DEFAULT_NEW_WINDOW: u32 = 5;
pub const NEW_WINDOW_MIN: u32 = 1;
pub const NEW_WINDOW_MAX: u32 = 50;

/// Time bucket size used to group sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Month, Granularity::Quarter, Granularity::Year];

    pub fn display_name(self) -> &'static str {
        match self {
            Granularity::Month => "Month",
            Granularity::Quarter => "Quarter",
            Granularity::Year => "Year",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Granularity::Month => Granularity::Quarter,
            Granularity::Quarter => Granularity::Year,
            Granularity::Year => Granularity::Month,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Granularity::Month => Granularity::Year,
            Granularity::Quarter => Granularity::Month,
            Granularity::Year => Granularity::Quarter,
        }
    }
}

/// Options that drive a single aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub granularity: Granularity,
    /// Add auxiliary surface to the traded total.
    pub include_aux_surface: bool,
    /// Properties built strictly before this year are "old".
    pub pre_1990_threshold: i32,
    /// A property is "new" if `sale_year - year_built <= new_years_window`.
    pub new_years_window: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            include_aux_surface: false,
            pre_1990_threshold: DEFAULT_PRE_YEAR,
            new_years_window: DEFAULT_NEW_WINDOW,
        }
    }
}

/// Age class of a sold property, relative to its sale date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    Pre1990,
    NewLast5y,
    MidAge,
    Unknown,
}

impl AgeBucket {
    /// Stable display order (tables, chart legends, CSV columns).
    pub const ALL: [AgeBucket; 4] = [
        AgeBucket::Pre1990,
        AgeBucket::NewLast5y,
        AgeBucket::MidAge,
        AgeBucket::Unknown,
    ];

    /// Label that reflects the thresholds in effect, e.g. `pre_1985` or `new_last10y`.
    pub fn label(self, config: &AggregationConfig) -> String {
        match self {
            AgeBucket::Pre1990 => format!("pre_{}", config.pre_1990_threshold),
            AgeBucket::NewLast5y => format!("new_last{}y", config.new_years_window),
            AgeBucket::MidAge => "mid_age".to_string(),
            AgeBucket::Unknown => "unknown".to_string(),
        }
    }
}

/// One parsed sale row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale_date: NaiveDate,
    pub year_built: Option<i32>,
    /// `None` when the cell is empty or not numeric.
    pub main_surface_sqm: Option<f64>,
    pub aux_surface_sqm: Option<f64>,
    /// Values of the optional filter columns present in the source file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// 1-based line in the source sheet.
    #[serde(default)]
    pub line: usize,
}

impl SaleRecord {
    pub fn new(sale_date: NaiveDate, year_built: Option<i32>, main_surface_sqm: Option<f64>) -> Self {
        Self {
            sale_date,
            year_built,
            main_surface_sqm,
            aux_surface_sqm: None,
            attributes: BTreeMap::new(),
            line: 0,
        }
    }

    pub fn with_aux(mut self, aux: Option<f64>) -> Self {
        self.aux_surface_sqm = aux;
        self
    }

    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    pub fn sale_year(&self) -> i32 {
        self.sale_date.year()
    }
}

/// Sortable period key. Ordering follows the period start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeriodKey {
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
}

impl PeriodKey {
    pub fn from_date(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Month => PeriodKey::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Quarter => PeriodKey::Quarter {
                year: date.year(),
                quarter: (date.month() - 1) / 3 + 1,
            },
            Granularity::Year => PeriodKey::Year { year: date.year() },
        }
    }

    /// First calendar day of the period.
    pub fn start_date(self) -> Option<NaiveDate> {
        match self {
            PeriodKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            PeriodKey::Quarter { year, quarter } => NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1),
            PeriodKey::Year { year } => NaiveDate::from_ymd_opt(year, 1, 1),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            PeriodKey::Quarter { year, quarter } => write!(f, "{year:04}-Q{quarter}"),
            PeriodKey::Year { year } => write!(f, "{year:04}"),
        }
    }
}

/// Aggregated statistics for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    #[serde(skip)]
    pub key: Option<PeriodKey>,
    pub period_label: String,
    /// First calendar day of the period; `None` for the totals row.
    pub period_start: Option<NaiveDate>,
    pub sale_count: usize,
    pub total_surface_sqm: f64,
    pub bucket_counts: BTreeMap<AgeBucket, usize>,
}

impl PeriodSummary {
    pub fn empty(key: PeriodKey) -> Self {
        Self {
            key: Some(key),
            period_label: key.to_string(),
            period_start: key.start_date(),
            sale_count: 0,
            total_surface_sqm: 0.0,
            bucket_counts: AgeBucket::ALL.iter().map(|&b| (b, 0)).collect(),
        }
    }

    pub fn count(&self, bucket: AgeBucket) -> usize {
        self.bucket_counts.get(&bucket).copied().unwrap_or(0)
    }

    /// Percent of this period's sales falling in `bucket` (0 when there are no sales).
    pub fn bucket_share(&self, bucket: AgeBucket) -> f64 {
        if self.sale_count == 0 {
            return 0.0;
        }
        self.count(bucket) as f64 * 100.0 / self.sale_count as f64
    }
}

/// Header names for the data columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub date: String,
    pub year_built: String,
    pub main_area: String,
    /// Optional in the file; only read when present.
    pub aux_area: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_COLUMN.to_string(),
            year_built: DEFAULT_BUILT_COLUMN.to_string(),
            main_area: DEFAULT_MAIN_AREA_COLUMN.to_string(),
            aux_area: DEFAULT_AUX_AREA_COLUMN.to_string(),
        }
    }
}

/// Equality filters over categorical attribute columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    filters: BTreeMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `COLUMN=VALUE` expression (value may contain `=`).
    pub fn parse_expr(expr: &str) -> Result<(String, String), String> {
        let Some((column, value)) = expr.split_once('=') else {
            return Err(format!("Invalid filter '{expr}'. Expected COLUMN=VALUE."));
        };
        let column = column.trim();
        let value = value.trim();
        if column.is_empty() || value.is_empty() {
            return Err(format!("Invalid filter '{expr}'. Expected COLUMN=VALUE."));
        }
        Ok((column.to_string(), value.to_string()))
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    pub fn without(mut self, column: &str) -> Self {
        self.filters.remove(column);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.filters.get(column).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// A record lacking a filtered attribute never matches.
    pub fn matches(&self, record: &SaleRecord) -> bool {
        self.filters.iter().all(|(column, value)| {
            record
                .attributes
                .get(column)
                .is_some_and(|v| v.trim() == value.trim())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_labels() {
        let d = date(2023, 11, 5);
        assert_eq!(PeriodKey::from_date(d, Granularity::Month).to_string(), "2023-11");
        assert_eq!(PeriodKey::from_date(d, Granularity::Quarter).to_string(), "2023-Q4");
        assert_eq!(PeriodKey::from_date(d, Granularity::Year).to_string(), "2023");
        assert_eq!(PeriodKey::from_date(date(2023, 3, 31), Granularity::Quarter).to_string(), "2023-Q1");
    }

    #[test]
    fn period_keys_sort_by_start() {
        let mut keys = vec![
            PeriodKey::Month { year: 2023, month: 2 },
            PeriodKey::Month { year: 2022, month: 12 },
            PeriodKey::Month { year: 2023, month: 1 },
        ];
        keys.sort();
        let labels: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(labels, ["2022-12", "2023-01", "2023-02"]);
        assert_eq!(
            PeriodKey::Quarter { year: 2023, quarter: 3 }.start_date(),
            Some(date(2023, 7, 1))
        );
    }

    #[test]
    fn bucket_labels_follow_thresholds() {
        let config = AggregationConfig {
            pre_1990_threshold: 1985,
            new_years_window: 10,
            ..AggregationConfig::default()
        };
        assert_eq!(AgeBucket::Pre1990.label(&config), "pre_1985");
        assert_eq!(AgeBucket::NewLast5y.label(&config), "new_last10y");
        assert_eq!(AgeBucket::Pre1990.label(&AggregationConfig::default()), "pre_1990");
    }

    #[test]
    fn filter_expr_parsing() {
        assert_eq!(
            FilterSet::parse_expr("Νομαρχία = ΑΤΤΙΚΗΣ").unwrap(),
            ("Νομαρχία".to_string(), "ΑΤΤΙΚΗΣ".to_string())
        );
        assert_eq!(
            FilterSet::parse_expr("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(FilterSet::parse_expr("novalue").is_err());
        assert!(FilterSet::parse_expr("col=").is_err());
    }

    #[test]
    fn filter_requires_attribute() {
        let filters = FilterSet::new().with("Νομαρχία", "ΑΤΤΙΚΗΣ");
        let hit = SaleRecord::new(date(2023, 1, 1), None, Some(50.0)).with_attribute("Νομαρχία", "ΑΤΤΙΚΗΣ");
        let other = SaleRecord::new(date(2023, 1, 1), None, Some(50.0)).with_attribute("Νομαρχία", "ΧΑΝΙΩΝ");
        let missing = SaleRecord::new(date(2023, 1, 1), None, Some(50.0));
        assert!(filters.matches(&hit));
        assert!(!filters.matches(&other));
        assert!(!filters.matches(&missing));
        assert!(FilterSet::new().matches(&missing));
    }

    #[test]
    fn bucket_share_handles_empty_period() {
        let summary = PeriodSummary::empty(PeriodKey::Year { year: 2020 });
        assert_eq!(summary.bucket_share(AgeBucket::Unknown), 0.0);
        assert_eq!(summary.count(AgeBucket::MidAge), 0);
    }
}
