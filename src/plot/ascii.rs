//! ASCII/Unicode bar charts for terminal output.
//!
//! This is intentionally "dumb" (one bar per period), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)

use clap::ValueEnum;

use crate::domain::PeriodSummary;

/// Which per-period value to chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    Sales,
    #[value(name = "sqm")]
    TradedSqm,
}

impl Metric {
    pub fn title(self) -> &'static str {
        match self {
            Metric::Sales => "Number of sales",
            Metric::TradedSqm => "Total sqm traded",
        }
    }

    pub fn value(self, s: &PeriodSummary) -> f64 {
        match self {
            Metric::Sales => s.sale_count as f64,
            Metric::TradedSqm => s.total_surface_sqm,
        }
    }
}

/// Render one horizontal bar per period, scaled so the largest value spans `width`.
pub fn render_bar_chart(summaries: &[PeriodSummary], metric: Metric, width: usize) -> String {
    let mut out = format!("{}\n", metric.title());
    if summaries.is_empty() {
        out.push_str("(no data)\n");
        return out;
    }

    let width = width.max(1);
    let max = summaries
        .iter()
        .map(|s| metric.value(s))
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let label_width = summaries.iter().map(|s| s.period_label.len()).max().unwrap_or(4);

    for s in summaries {
        let value = metric.value(s);
        let bar_len = if max > 0.0 && value.is_finite() {
            ((value / max) * width as f64).round() as usize
        } else {
            0
        };
        let line = format!(
            "{:<label_width$} │{} {}",
            s.period_label,
            "█".repeat(bar_len),
            fmt_value(value, metric)
        );
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn fmt_value(v: f64, metric: Metric) -> String {
    match metric {
        Metric::Sales => format!("{v:.0}"),
        Metric::TradedSqm => format!("{v:.1}"),
    }
}
