//! Terminal-friendly formatting for aggregated summaries.

use crate::aggregate::totals;
use crate::domain::{AgeBucket, AggregationConfig, FilterSet, PeriodSummary};
use crate::io::ingest::SalesTable;

/// Format a short run header: sources, row counts, options and filters.
pub fn format_run_header(table: &SalesTable, config: &AggregationConfig, filters: &FilterSet) -> String {
    let mut out = String::new();

    out.push_str("Sources:\n");
    for source in &table.sources {
        out.push_str(&format!("- {source}\n"));
    }
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        table.rows_read,
        table.rows_used(),
        table.rows_skipped()
    ));
    out.push_str(&format!(
        "Options: group by {} | aux area {} | old < {} | new ≤ {}y after build\n",
        config.granularity.display_name().to_lowercase(),
        if config.include_aux_surface { "included" } else { "excluded" },
        config.pre_1990_threshold,
        config.new_years_window,
    ));
    if config.include_aux_surface && !table.has_aux_column {
        out.push_str("Note: auxiliary area column not found; totals use main area only.\n");
    }
    if !filters.is_empty() {
        let parts: Vec<String> = filters.iter().map(|(c, v)| format!("{c}={v}")).collect();
        out.push_str(&format!("Filters: {}\n", parts.join(", ")));
    }

    out
}

/// Format the aggregated table with a totals row.
pub fn format_summary_table(summaries: &[PeriodSummary], config: &AggregationConfig) -> String {
    if summaries.is_empty() {
        return "No sales in the selected data.\n".to_string();
    }

    let labels: Vec<String> = AgeBucket::ALL.iter().map(|b| b.label(config)).collect();
    let bucket_width = labels.iter().map(|l| l.len()).max().unwrap_or(8).max(8);

    let mut out = String::new();
    let mut header = format!("{:<10} {:>8} {:>14}", "period", "sales", "traded_sqm");
    for label in &labels {
        header.push_str(&format!(" {label:>bucket_width$}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let mut rule = format!("{:-<10} {:-<8} {:-<14}", "", "", "");
    for _ in &labels {
        rule.push_str(&format!(" {:-<bucket_width$}", ""));
    }
    out.push_str(&rule);
    out.push('\n');

    for s in summaries {
        out.push_str(&format_row(s, bucket_width));
        out.push('\n');
    }

    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format_row(&totals(summaries), bucket_width));
    out.push('\n');

    out
}

fn format_row(s: &PeriodSummary, bucket_width: usize) -> String {
    let mut row = format!(
        "{:<10} {:>8} {:>14.1}",
        truncate(&s.period_label, 10),
        s.sale_count,
        s.total_surface_sqm
    );
    for bucket in AgeBucket::ALL {
        let cell = format!("{} ({:.0}%)", s.count(bucket), s.bucket_share(bucket));
        row.push_str(&format!(" {cell:>bucket_width$}"));
    }
    row.trim_end().to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
