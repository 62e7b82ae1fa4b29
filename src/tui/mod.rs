//! Ratatui-based terminal dashboard.
//!
//! The TUI provides a settings panel for the aggregation options, the bundled
//! year range and the drill-down filters, then renders one chart and the
//! aggregated table. Every change builds a new `Session` and recomputes the
//! summaries from it; failures only update the status line.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table},
};
use tracing::{debug, warn};

use crate::app::pipeline::{self, Fallback, SourcePlan};
use crate::app::state::Session;
use crate::cli::RunArgs;
use crate::cli::picker::BundledFile;
use crate::domain::{AgeBucket, PeriodSummary};
use crate::error::AppError;
use crate::io::ingest::IngestOptions;

mod plotters_chart;

use plotters_chart::{ChartStyle, PeriodChart, Series, to_tui_color};

/// Start the TUI.
///
/// Sources are loaded before the terminal is switched to raw mode, so load
/// errors are printed like any other command error.
pub fn run(args: RunArgs) -> Result<(), AppError> {
    let loaded = pipeline::load_session(&args, Fallback::Fail)?;
    let mut app = App::new(loaded.session, loaded.plan, loaded.options);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Chart shown in the chart panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartKind {
    Sales,
    TradedSqm,
    AgeMixCounts,
    AgeMixShare,
}

impl ChartKind {
    fn next(self) -> Self {
        match self {
            ChartKind::Sales => ChartKind::TradedSqm,
            ChartKind::TradedSqm => ChartKind::AgeMixCounts,
            ChartKind::AgeMixCounts => ChartKind::AgeMixShare,
            ChartKind::AgeMixShare => ChartKind::Sales,
        }
    }

    fn title(self, granularity: &str) -> String {
        match self {
            ChartKind::Sales => format!("Number of sales per {granularity}"),
            ChartKind::TradedSqm => format!("Total sqm traded per {granularity}"),
            ChartKind::AgeMixCounts => "Age mix (counts)".to_string(),
            ChartKind::AgeMixShare => "Age mix (% of sales)".to_string(),
        }
    }
}

/// Selectable rows of the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Granularity,
    IncludeAux,
    PreYear,
    NewWindow,
    FromYear,
    ToYear,
    Filter(String),
}

struct App {
    session: Session,
    summaries: Vec<PeriodSummary>,
    plan: SourcePlan,
    options: IngestOptions,
    selected_field: usize,
    chart: ChartKind,
    table_offset: usize,
    status: String,
}

impl App {
    fn new(session: Session, plan: SourcePlan, options: IngestOptions) -> Self {
        let summaries = session.summaries();
        let status = match session.table().rows_skipped() {
            0 => format!("Loaded {} sales.", session.table().rows_used()),
            n => format!(
                "Loaded {} sales; skipped {n} row(s) with an unparseable date.",
                session.table().rows_used()
            ),
        };
        Self {
            session,
            summaries,
            plan,
            options,
            selected_field: 0,
            chart: ChartKind::Sales,
            table_offset: 0,
            status,
        }
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Granularity, Field::IncludeAux, Field::PreYear, Field::NewWindow];
        if matches!(self.plan, SourcePlan::Bundled { .. }) {
            fields.push(Field::FromYear);
            fields.push(Field::ToYear);
        }
        fields.extend(
            self.session
                .table()
                .attribute_columns
                .iter()
                .map(|c| Field::Filter(c.clone())),
        );
        fields
    }

    /// Install a new state and recompute the summaries from it.
    fn apply(&mut self, session: Session) {
        self.summaries = session.summaries();
        self.session = session;
        self.table_offset = self.table_offset.min(self.summaries.len().saturating_sub(1));
        // A reload can drop filter columns.
        self.selected_field = self.selected_field.min(self.fields().len().saturating_sub(1));
        debug!(periods = self.summaries.len(), config = ?self.session.config(), "recomputed summaries");
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let field_count = self.fields().len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < field_count {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('c') => {
                self.chart = self.chart.next();
            }
            KeyCode::PageDown => {
                self.table_offset = (self.table_offset + 5).min(self.summaries.len().saturating_sub(1));
            }
            KeyCode::PageUp => {
                self.table_offset = self.table_offset.saturating_sub(5);
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        let fields = self.fields();
        let Some(field) = fields.get(self.selected_field).cloned() else {
            return;
        };
        let config = self.session.config().clone();

        match field {
            Field::Granularity => {
                let g = if delta >= 0 { config.granularity.next() } else { config.granularity.prev() };
                self.apply(self.session.with_granularity(g));
                self.status = format!("Group by {}", g.display_name());
            }
            Field::IncludeAux => {
                let include = !config.include_aux_surface;
                self.apply(self.session.with_include_aux(include));
                self.status = if include && !self.session.table().has_aux_column {
                    "Auxiliary area column not found; totals use main area only.".to_string()
                } else if include {
                    "Auxiliary area included.".to_string()
                } else {
                    "Auxiliary area excluded.".to_string()
                };
            }
            Field::PreYear => {
                let year = config.pre_1990_threshold.saturating_add(delta);
                self.apply(self.session.with_pre_year(year));
                self.status = format!("Old threshold: built before {year}");
            }
            Field::NewWindow => {
                let window = config.new_years_window.saturating_add_signed(delta);
                self.apply(self.session.with_new_window(window));
                self.status = format!("New = built within {} years of sale", self.session.config().new_years_window);
            }
            Field::FromYear | Field::ToYear => self.adjust_year_range(field == Field::FromYear, delta),
            Field::Filter(column) => self.adjust_filter(&column, delta),
        }
    }

    fn adjust_year_range(&mut self, is_from: bool, delta: i32) {
        let SourcePlan::Bundled { available, selected } = &self.plan else {
            return;
        };
        let Some(next) = step_selection(available, selected, is_from, delta) else {
            return;
        };

        let paths: Vec<_> = next.iter().map(|f| f.path.clone()).collect();
        match pipeline::load_all(&paths, &self.options) {
            Ok(table) => {
                let session = self.session.with_table(table);
                let years: Vec<String> = next.iter().map(|f| f.year.to_string()).collect();
                self.plan = SourcePlan::Bundled {
                    available: available.clone(),
                    selected: next,
                };
                self.apply(session);
                self.status = format!("Years: {}", years.join(", "));
            }
            Err(err) => {
                warn!(error = %err, "failed to load bundled years");
                self.status = format!("Load failed: {err}");
            }
        }
    }

    fn adjust_filter(&mut self, column: &str, delta: i32) {
        // Index 0 is "(all)".
        let values = self.session.table().attribute_values(column);
        let current = self
            .session
            .filters()
            .get(column)
            .and_then(|v| values.iter().position(|x| x == v))
            .map_or(0, |i| i + 1);
        let n = values.len() + 1;
        let next = if delta >= 0 { (current + 1) % n } else { (current + n - 1) % n };

        let filters = self.session.filters().clone();
        let filters = match next {
            0 => filters.without(column),
            i => filters.with(column, values[i - 1].clone()),
        };
        self.apply(self.session.with_filters(filters));
        self.status = match self.session.filters().get(column) {
            Some(v) => format!("{column} = {v}"),
            None => format!("{column}: (all)"),
        };
    }

    fn export(&mut self) {
        let path = std::path::Path::new(crate::io::DEFAULT_EXPORT_NAME);
        self.status = match crate::io::write_summaries_csv(path, &self.summaries, self.session.config()) {
            Ok(()) => format!("Wrote {} period(s) to {}", self.summaries.len(), path.display()),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn reload(&mut self) {
        match pipeline::load_all(&self.plan.paths(), &self.options) {
            Ok(table) => {
                let skipped = table.rows_skipped();
                let session = self.session.with_table(table);
                self.apply(session);
                self.status = format!(
                    "Reloaded {} sales ({skipped} skipped).",
                    self.session.table().rows_used()
                );
            }
            Err(err) => {
                warn!(error = %err, "reload failed");
                self.status = format!("Reload failed: {err}");
            }
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let table = self.session.table();
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("trends", Style::default().fg(Color::Cyan)),
            Span::raw(" · Greece house sales trends"),
        ]));

        let sources = match &self.plan {
            SourcePlan::Files(files) => files
                .iter()
                .map(|p| crate::cli::picker::pretty_path(p))
                .collect::<Vec<_>>()
                .join(", "),
            SourcePlan::Bundled { selected, .. } => {
                let years: Vec<String> = selected.iter().map(|f| f.year.to_string()).collect();
                format!("bundled years: {}", years.join(", "))
            }
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{sources} | rows: {} used, {} skipped",
                table.rows_used(),
                table.rows_skipped()
            ),
            Style::default().fg(Color::Gray),
        )));

        let filters = self.session.filters();
        let filter_text = if filters.is_empty() {
            "filters: none".to_string()
        } else {
            let parts: Vec<String> = filters.iter().map(|(c, v)| format!("{c}={v}")).collect();
            format!("filters: {}", parts.join(", "))
        };
        lines.push(Line::from(Span::styled(filter_text, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(0)])
            .split(area);

        self.draw_settings(frame, columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(12)])
            .split(columns[1]);

        self.draw_chart(frame, right[0]);
        self.draw_table(frame, right[1]);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let config = self.session.config();
        let items: Vec<ListItem> = self
            .fields()
            .iter()
            .map(|field| {
                let text = match field {
                    Field::Granularity => format!("Group by: {}", config.granularity.display_name()),
                    Field::IncludeAux => format!(
                        "Aux area: {}",
                        if config.include_aux_surface { "included" } else { "excluded" }
                    ),
                    Field::PreYear => format!("Old: built < {}", config.pre_1990_threshold),
                    Field::NewWindow => format!("New: ≤ {}y after build", config.new_years_window),
                    Field::FromYear => format!("From year: {}", self.year_bound(true)),
                    Field::ToYear => format!("To year: {}", self.year_bound(false)),
                    Field::Filter(column) => format!(
                        "{column}: {}",
                        self.session.filters().get(column).unwrap_or("(all)")
                    ),
                };
                ListItem::new(text)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn year_bound(&self, first: bool) -> String {
        let SourcePlan::Bundled { selected, .. } = &self.plan else {
            return "-".to_string();
        };
        let f = if first { selected.first() } else { selected.last() };
        f.map(|f| f.year.to_string()).unwrap_or_else(|| "-".to_string())
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let granularity = self.session.config().granularity.display_name().to_lowercase();
        let block = Block::default()
            .title(format!("{} (c: next chart)", self.chart.title(&granularity)))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if self.summaries.is_empty() {
            let msg = Paragraph::new("No sales match the current selection.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let data = chart_data(&self.summaries, self.chart, self.session.config());

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let widget = PeriodChart {
            labels: &data.labels,
            series: &data.series,
            style: data.style,
            y_bounds: data.y_bounds,
            y_label: data.y_label,
        };
        frame.render_widget(widget, parts[0]);

        let mut legend: Vec<Span> = Vec::new();
        for s in &data.series {
            legend.push(Span::styled("■ ", Style::default().fg(to_tui_color(s.color))));
            legend.push(Span::raw(format!("{}  ", s.name)));
        }
        frame.render_widget(Paragraph::new(Line::from(legend)), parts[1]);
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let config = self.session.config();
        let mut header = vec!["period".to_string(), "sales".to_string(), "traded_sqm".to_string()];
        header.extend(AgeBucket::ALL.iter().map(|b| b.label(config)));
        let header = Row::new(header.into_iter().map(Cell::from))
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self.summaries.iter().skip(self.table_offset).map(|s| {
            let mut cells = vec![
                s.period_label.clone(),
                s.sale_count.to_string(),
                format!("{:.1}", s.total_surface_sqm),
            ];
            cells.extend(AgeBucket::ALL.iter().map(|&b| s.count(b).to_string()));
            Row::new(cells.into_iter().map(Cell::from))
        });

        let widths = [
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths).header(header).block(
            Block::default()
                .title(format!(
                    "Aggregated table ({} periods, PgUp/PgDn scroll)",
                    self.summaries.len()
                ))
                .borders(Borders::ALL),
        );
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  c chart  e export  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Move one edge of a bundled selection by one file.
///
/// Years between the edges stay as selected, so a gapped `--year` selection
/// keeps its gaps. Returns `None` when the edge cannot move.
fn step_selection(
    available: &[BundledFile],
    selected: &[BundledFile],
    is_from: bool,
    delta: i32,
) -> Option<Vec<BundledFile>> {
    let first = available.iter().position(|f| Some(f) == selected.first())?;
    let last = available.iter().position(|f| Some(f) == selected.last())?;
    let mut next = selected.to_vec();
    match (is_from, delta >= 0) {
        (true, false) => next.insert(0, available.get(first.checked_sub(1)?)?.clone()),
        (false, true) => next.push(available.get(last + 1)?.clone()),
        // Never shrink below one year.
        _ if next.len() <= 1 => return None,
        (true, true) => {
            next.remove(0);
        }
        (false, false) => {
            next.pop();
        }
    }
    Some(next)
}

const SALES_COLOR: RGBColor = RGBColor(0, 255, 255);
const SQM_COLOR: RGBColor = RGBColor(255, 200, 0);
const BUCKET_COLORS: [RGBColor; 4] = [
    RGBColor(200, 80, 80),  // old
    RGBColor(80, 200, 80),  // new
    RGBColor(80, 140, 255), // mid
    RGBColor(160, 160, 160), // unknown
];

/// Everything the chart widget needs, computed outside the render call.
struct ChartData {
    labels: Vec<String>,
    series: Vec<Series>,
    style: ChartStyle,
    y_bounds: [f64; 2],
    y_label: &'static str,
}

fn chart_data(summaries: &[PeriodSummary], kind: ChartKind, config: &crate::domain::AggregationConfig) -> ChartData {
    let labels: Vec<String> = summaries.iter().map(|s| s.period_label.clone()).collect();
    let indexed = |f: &dyn Fn(&PeriodSummary) -> f64| -> Vec<(f64, f64)> {
        summaries.iter().enumerate().map(|(i, s)| (i as f64, f(s))).collect()
    };

    let (series, style, y_label) = match kind {
        ChartKind::Sales => (
            vec![Series {
                name: "sales".to_string(),
                color: SALES_COLOR,
                points: indexed(&|s| s.sale_count as f64),
            }],
            ChartStyle::Lines,
            "sales",
        ),
        ChartKind::TradedSqm => (
            vec![Series {
                name: "traded sqm".to_string(),
                color: SQM_COLOR,
                points: indexed(&|s| s.total_surface_sqm),
            }],
            ChartStyle::Lines,
            "sqm",
        ),
        ChartKind::AgeMixCounts | ChartKind::AgeMixShare => {
            let share = kind == ChartKind::AgeMixShare;
            let mut series = Vec::with_capacity(AgeBucket::ALL.len());
            let mut running = vec![0.0_f64; summaries.len()];
            for (bucket, color) in AgeBucket::ALL.iter().zip(BUCKET_COLORS) {
                for (acc, s) in running.iter_mut().zip(summaries) {
                    *acc += if share { s.bucket_share(*bucket) } else { s.count(*bucket) as f64 };
                }
                series.push(Series {
                    name: bucket.label(config),
                    color,
                    points: running.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect(),
                });
            }
            (series, ChartStyle::StackedArea, if share { "% of sales" } else { "sales" })
        }
    };

    ChartData {
        labels,
        y_bounds: y_bounds(&series),
        series,
        style,
        y_label,
    }
}

fn y_bounds(series: &[Series]) -> [f64; 2] {
    let max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|&(_, y)| y))
        .filter(|y| y.is_finite())
        .fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return [0.0, 1.0];
    }
    [0.0, max * 1.05]
}
