//! Plotters-powered period chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! The x axis is the period index; tick labels are mapped back to period labels.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One named series, already positioned on the period index axis.
pub struct Series {
    pub name: String,
    pub color: RGBColor,
    pub points: Vec<(f64, f64)>,
}

/// How series are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartStyle {
    /// One line per series.
    Lines,
    /// Series are cumulative layers; drawn as filled areas, topmost first.
    StackedArea,
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call, which keeps
/// `render()` focused on drawing.
pub struct PeriodChart<'a> {
    pub labels: &'a [String],
    pub series: &'a [Series],
    pub style: ChartStyle,
    pub y_bounds: [f64; 2],
    pub y_label: &'a str,
}

impl PeriodChart<'_> {
    fn x_bounds(&self) -> [f64; 2] {
        let n = self.labels.len().max(1) as f64;
        [-0.5, n - 0.5]
    }

    fn label_at(&self, v: f64) -> String {
        let idx = v.round();
        if (v - idx).abs() > 0.25 || idx < 0.0 {
            return String::new();
        }
        self.labels.get(idx as usize).cloned().unwrap_or_default()
    }
}

impl Widget for PeriodChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds();
        let [y0, y1] = self.y_bounds;
        if !(y0.is_finite() && y1.is_finite()) || y1 <= y0 {
            return;
        }

        let x_labels = self.labels.len().clamp(1, 6);

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .y_desc(self.y_label)
                .x_labels(x_labels)
                .y_labels(5)
                .x_label_formatter(&|v| self.label_at(*v))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            match self.style {
                ChartStyle::Lines => {
                    for s in self.series {
                        chart.draw_series(LineSeries::new(s.points.iter().copied(), &s.color))?;
                        // A single period has no line to draw; mark the value instead.
                        chart.draw_series(s.points.iter().map(|&(x, y)| Pixel::new((x, y), s.color)))?;
                    }
                }
                ChartStyle::StackedArea => {
                    // Lower layers are drawn last so they paint over the layers above.
                    for s in self.series.iter().rev() {
                        chart.draw_series(
                            AreaSeries::new(s.points.iter().copied(), 0.0, s.color.mix(0.6).filled())
                                .border_style(&s.color),
                        )?;
                    }
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Convert a Plotters color to the matching Ratatui color (for legends).
pub fn to_tui_color(c: RGBColor) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}
