//! Export aggregated summaries to CSV or JSON.
//!
//! The CSV is meant to be easy to open in spreadsheets: it starts with a UTF-8
//! BOM so Excel picks the right encoding for the Greek labels.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{AgeBucket, AggregationConfig, PeriodSummary};
use crate::error::AppError;

/// Default file name used by the TUI export key.
pub const DEFAULT_EXPORT_NAME: &str = "aggregated_trends.csv";

/// Write summaries as CSV: `period,sales,traded_sqm,<one column per age bucket>`.
pub fn write_summaries_csv(
    path: &Path,
    summaries: &[PeriodSummary],
    config: &AggregationConfig,
) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    file.write_all("\u{feff}".as_bytes())
        .map_err(|e| AppError::input(format!("Failed to write export CSV: {e}")))?;

    write_summaries(&mut file, summaries, config)
}

/// Write summaries as CSV to any writer (no BOM).
pub fn write_summaries<W: Write>(
    writer: W,
    summaries: &[PeriodSummary],
    config: &AggregationConfig,
) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["period".to_string(), "sales".to_string(), "traded_sqm".to_string()];
    header.extend(AgeBucket::ALL.iter().map(|b| b.label(config)));
    out.write_record(&header)
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for s in summaries {
        let mut row = vec![
            s.period_label.clone(),
            s.sale_count.to_string(),
            format!("{:.2}", s.total_surface_sqm),
        ];
        row.extend(AgeBucket::ALL.iter().map(|&b| s.count(b).to_string()));
        out.write_record(&row)
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::input(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// JSON document printed by `trends summary --json`.
#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    pub config: &'a AggregationConfig,
    pub bucket_labels: Vec<String>,
    pub rows_used: usize,
    pub rows_skipped: usize,
    pub periods: &'a [PeriodSummary],
}

pub fn summaries_json(
    summaries: &[PeriodSummary],
    config: &AggregationConfig,
    rows_used: usize,
    rows_skipped: usize,
) -> Result<String, AppError> {
    let doc = SummaryDocument {
        config,
        bucket_labels: AgeBucket::ALL.iter().map(|b| b.label(config)).collect(),
        rows_used,
        rows_skipped,
        periods: summaries,
    };
    serde_json::to_string_pretty(&doc).map_err(|e| AppError::input(format!("Failed to encode JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::domain::SaleRecord;
    use chrono::NaiveDate;

    fn sample() -> Vec<PeriodSummary> {
        let d = |m| NaiveDate::from_ymd_opt(2023, m, 1).unwrap();
        let records = vec![
            SaleRecord::new(d(1), Some(1980), Some(50.0)),
            SaleRecord::new(d(1), None, Some(25.5)),
            SaleRecord::new(d(2), Some(2021), Some(100.0)),
        ];
        aggregate(&records, &AggregationConfig::default())
    }

    #[test]
    fn csv_layout() {
        let mut buf = Vec::new();
        write_summaries(&mut buf, &sample(), &AggregationConfig::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "period,sales,traded_sqm,pre_1990,new_last5y,mid_age,unknown");
        assert_eq!(lines[1], "2023-01,2,75.50,1,0,0,1");
        assert_eq!(lines[2], "2023-02,1,100.00,0,1,0,0");
    }

    #[test]
    fn csv_file_starts_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_summaries_csv(&path, &sample(), &AggregationConfig::default()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with("\u{feff}period".as_bytes()));
    }

    #[test]
    fn json_contains_periods() {
        let json = summaries_json(&sample(), &AggregationConfig::default(), 3, 1).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows_skipped"], 1);
        assert_eq!(value["periods"][0]["period_label"], "2023-01");
        assert_eq!(value["periods"][0]["period_start"], "2023-01-01");
        assert_eq!(value["periods"][0]["bucket_counts"]["pre1990"], 1);
        assert_eq!(value["config"]["granularity"], "month");
    }
}
