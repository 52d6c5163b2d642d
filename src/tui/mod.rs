//! Ratatui-based terminal UI.
//!
//! The TUI is the dashboard: a region list on the left, the selected growth
//! curve (with any loaded observations) on the right, and a status line saying
//! whether the bundled defaults or a custom parameter file is in use. Files are
//! loaded through an overlay picker; a failed load keeps the current data.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::cli::picker::{discover_table_files, pretty_path};
use crate::domain::{GrowthCurve, RunConfig};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::io::params::ParameterSource;
use crate::report::{ComparisonRow, Deviations, rank_deviations, summarize};
use crate::session::Session;

mod plotters_chart;

use plotters_chart::GrowthChart;

/// Highlighted deviations on each side of the curve.
const TOP_DEVIATIONS: usize = 5;

/// Start the TUI.
///
/// The initial tables are loaded before the terminal switches to raw mode so
/// load errors print like any other command error.
pub fn run(config: &RunConfig) -> Result<(), AppError> {
    let mut session = crate::app::pipeline::open_session(config)?;
    if let Some(path) = &config.observations_path {
        session.reload_observations(path)?;
    }

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(session);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(
                EXIT_RUNTIME,
                format!("Failed to enter alternate screen: {e}"),
            ));
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickerTarget {
    Parameters,
    Observations,
}

impl PickerTarget {
    fn title(self) -> &'static str {
        match self {
            PickerTarget::Parameters => "Load parameter file",
            PickerTarget::Observations => "Load observation file",
        }
    }
}

#[derive(Debug, Clone)]
struct FilePicker {
    target: PickerTarget,
    files: Vec<PathBuf>,
    selected: usize,
}

struct App {
    session: Session,
    /// Highlighted row of the region list.
    selected: usize,
    /// Identifier whose curve is displayed (set with Enter).
    shown: Option<String>,
    status: String,
    status_is_error: bool,
    picker: Option<FilePicker>,
}

impl App {
    fn new(session: Session) -> Self {
        let status = session.status_message().to_string();
        Self {
            session,
            selected: 0,
            shown: None,
            status,
            status_is_error: false,
            picker: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))? {
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

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.picker.is_some() {
            self.handle_picker_key(code);
            return false;
        }

        let n = self.session.parameters().len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected + 1 < n {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => {
                let picked = self.session.parameters().ids().nth(self.selected).map(str::to_string);
                if let Some(id) = picked {
                    self.set_status(format!("Showing {id}."));
                    self.shown = Some(id);
                }
            }
            KeyCode::Char('o') => self.open_picker(PickerTarget::Parameters),
            KeyCode::Char('b') => self.open_picker(PickerTarget::Observations),
            KeyCode::Char('d') => match self.session.reset_to_defaults() {
                Ok(()) => {
                    self.after_parameters_changed();
                    self.set_status(self.session.status_message());
                }
                Err(err) => self.set_error(format!("Error loading defaults: {err}")),
            },
            _ => {}
        }
        false
    }

    fn handle_picker_key(&mut self, code: KeyCode) {
        let Some(picker) = self.picker.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.picker = None;
                self.set_status("Canceled.");
            }
            KeyCode::Up => {
                picker.selected = picker.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if picker.selected + 1 < picker.files.len() {
                    picker.selected += 1;
                }
            }
            KeyCode::Enter => {
                let target = picker.target;
                let path = picker.files.get(picker.selected).cloned();
                self.picker = None;
                if let Some(path) = path {
                    match target {
                        PickerTarget::Parameters => self.load_parameters(path),
                        PickerTarget::Observations => self.load_observations(path),
                    }
                }
            }
            _ => {}
        }
    }

    fn open_picker(&mut self, target: PickerTarget) {
        let files = discover_table_files();
        if files.is_empty() {
            self.set_error("No table files (.csv/.xlsx/.xls) found under the current directory.");
            return;
        }
        self.picker = Some(FilePicker {
            target,
            files,
            selected: 0,
        });
    }

    fn load_parameters(&mut self, path: PathBuf) {
        match self.session.reload_parameters(&ParameterSource::Path(path)) {
            Ok(()) => {
                self.after_parameters_changed();
                self.set_status(self.session.status_message());
            }
            Err(err) => {
                let msg = format!("Error loading file: {err}. Keeping {}.", self.session.origin());
                self.set_error(msg);
            }
        }
    }

    fn load_observations(&mut self, path: PathBuf) {
        match self.session.reload_observations(&path) {
            Ok(()) => {
                let msg = self
                    .session
                    .observations()
                    .map(|o| {
                        format!(
                            "Loaded {} observation(s) from {} ({} skipped).",
                            o.records.len(),
                            o.origin,
                            o.row_errors.len()
                        )
                    })
                    .unwrap_or_default();
                self.set_status(msg);
            }
            Err(err) => self.set_error(format!("Error loading observations: {err}")),
        }
    }

    /// Keep list selection and shown curve valid for the new set.
    fn after_parameters_changed(&mut self) {
        let params = self.session.parameters();
        if self.selected >= params.len() {
            self.selected = 0;
        }
        if let Some(id) = &self.shown {
            if !params.contains(id) {
                self.shown = None;
            }
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
        self.status_is_error = false;
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
        self.status_is_error = true;
    }

    fn shown_curve(&self) -> Option<GrowthCurve> {
        self.shown.as_deref().and_then(|id| self.session.curve(id))
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        if let Some(picker) = &self.picker {
            draw_picker(frame, size, picker);
        }
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("growth", Style::default().fg(Color::Cyan)),
            Span::raw(" | Gompertz growth curves"),
        ]));

        let status_color = if self.session.is_default() { Color::Gray } else { Color::Green };
        lines.push(Line::from(vec![
            Span::styled(self.session.status_message(), Style::default().fg(status_color)),
            Span::styled(
                format!(" ({}, {} region(s))", self.session.origin(), self.session.parameters().len()),
                Style::default().fg(Color::Gray),
            ),
        ]));

        let obs = match self.session.observations() {
            Some(o) => format!("observations: {} ({} record(s))", o.origin, o.records.len()),
            None => "observations: none".to_string(),
        };
        lines.push(Line::from(Span::styled(obs, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(26), Constraint::Min(0)])
            .split(area);

        self.draw_regions(frame, cols[0]);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(6)])
            .split(cols[1]);

        let curve = self.shown_curve();
        let comparison = self.session.comparison();
        let obs_rows: Vec<ComparisonRow> = match (&curve, &comparison) {
            (Some(c), Some(cmp)) => cmp.rows_for(c.id()).cloned().collect(),
            _ => Vec::new(),
        };

        self.draw_chart(frame, rows[0], curve.as_ref(), &obs_rows);
        self.draw_details(frame, rows[1], curve.as_ref(), &obs_rows);
    }

    fn draw_regions(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .session
            .parameters()
            .ids()
            .map(|id| {
                let marker = if self.shown.as_deref() == Some(id) { "* " } else { "  " };
                ListItem::new(format!("{marker}{id}"))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Regions").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(
        &self,
        frame: &mut ratatui::Frame<'_>,
        area: Rect,
        curve: Option<&GrowthCurve>,
        obs_rows: &[ComparisonRow],
    ) {
        let title = curve
            .map(|c| format!("Growth curve: {}", c.id()))
            .unwrap_or_else(|| "Growth curve".to_string());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(curve) = curve else {
            let msg = Paragraph::new("Select a region and press Enter to show its curve.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let deviations = rank_deviations(obs_rows, TOP_DEVIATIONS);
        let series = chart_series(curve, obs_rows, Some(&deviations));
        let Some(series) = series else {
            let msg = Paragraph::new("No finite predictions to draw for this region.")
                .style(Style::default().fg(Color::Red));
            frame.render_widget(msg, inner);
            return;
        };

        let widget = GrowthChart {
            segments: &series.segments,
            points: &series.points,
            above: &series.above,
            below: &series.below,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "t (days)",
            y_label: "weight",
        };
        frame.render_widget(widget, inner);
    }

    fn draw_details(
        &self,
        frame: &mut ratatui::Frame<'_>,
        area: Rect,
        curve: Option<&GrowthCurve>,
        obs_rows: &[ComparisonRow],
    ) {
        let mut lines: Vec<Line> = Vec::new();
        let gray = Style::default().fg(Color::Gray);

        if let Some(curve) = curve {
            let p = &curve.params;
            lines.push(Line::from(Span::styled(
                format!("{}: b0={} b1={} b2={}", p.id, p.b0, p.b1, p.b2),
                gray,
            )));

            let bad = curve.non_finite_count();
            if bad > 0 {
                lines.push(Line::from(Span::styled(
                    format!("! {bad} non-finite prediction(s) not drawn"),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            }

            if let Some(s) = summarize(obs_rows).first() {
                let fmt = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string());
                lines.push(Line::from(Span::styled(
                    format!(
                        "observations n={} | mean residual={} | rmse={} | max|res|={}",
                        s.n,
                        fmt(s.mean_residual),
                        fmt(s.rmse),
                        fmt(s.max_abs_residual)
                    ),
                    gray,
                )));
            }
        }

        if let Some(cmp) = self.session.comparison() {
            if !cmp.unmatched.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("{} observation(s) have no matching region", cmp.unmatched.len()),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Details").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  Enter show  o load params  b load obs  d defaults  q quit";
        let status_color = if self.status_is_error { Color::Red } else { Color::Yellow };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(status_color)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_picker(frame: &mut ratatui::Frame<'_>, area: Rect, picker: &FilePicker) {
    let rect = centered_rect(area, 60, 60);
    frame.render_widget(Clear, rect);

    let items: Vec<ListItem> = picker
        .files
        .iter()
        .map(|p| ListItem::new(pretty_path(p)))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!("{} (Enter load, Esc cancel)", picker.target.title()))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
        .highlight_symbol("» ");

    let mut state = ListState::default();
    state.select(Some(picker.selected));
    frame.render_stateful_widget(list, rect, &mut state);
}

/// A rect of `pct_x` x `pct_y` percent centered in `area`.
fn centered_rect(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let width = area.width * pct_x.min(100) / 100;
    let height = area.height * pct_y.min(100) / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Series and bounds for the chart widget.
#[derive(Debug, Clone, PartialEq)]
struct ChartSeries {
    segments: Vec<Vec<(f64, f64)>>,
    points: Vec<(f64, f64)>,
    above: Vec<(f64, f64)>,
    below: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series; `None` when nothing finite can be drawn.
fn chart_series(curve: &GrowthCurve, obs: &[ComparisonRow], deviations: Option<&Deviations>) -> Option<ChartSeries> {
    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current = Vec::new();
    for &(t, y) in &curve.points {
        if t.is_finite() && y.is_finite() {
            current.push((t, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    let points: Vec<(f64, f64)> = obs.iter().map(|r| (r.time, r.observed)).collect();
    let (above, below): (Vec<(f64, f64)>, Vec<(f64, f64)>) = deviations
        .map(|d| {
            (
                d.above.iter().map(|r| (r.time, r.observed)).collect(),
                d.below.iter().map(|r| (r.time, r.observed)).collect(),
            )
        })
        .unwrap_or_default();

    let all = segments.iter().flatten().chain(points.iter());
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if !(x_min.is_finite() && x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
        return None;
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    Some(ChartSeries {
        segments,
        points,
        above,
        below,
        x_bounds: [x_min, x_max],
        y_bounds: [y_min - pad, y_max + pad],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CurveParameters;
    use crate::models::{evaluate, linspace};
    use crate::session::{STATUS_CUSTOM, STATUS_DEFAULT};

    fn app() -> App {
        App::new(Session::open(&ParameterSource::Bundled, linspace(0.0, 800.0, 50)).unwrap())
    }

    fn picker_for(app: &mut App, target: PickerTarget, path: PathBuf) {
        app.picker = Some(FilePicker {
            target,
            files: vec![path],
            selected: 0,
        });
    }

    #[test]
    fn starts_on_defaults_and_enter_shows_the_selected_region() {
        let mut app = app();
        assert_eq!(app.status, STATUS_DEFAULT);
        assert!(app.shown_curve().is_none());

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.shown.as_deref(), Some("South"));
        assert_eq!(app.status, "Showing South.");
        assert_eq!(app.shown_curve().unwrap().points.len(), 50);

        app.handle_key(KeyCode::Up);
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected, 0);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn loading_a_parameter_file_then_resetting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herd.csv");
        std::fs::write(&path, "id,b0,b1,b2\nHerd1,480,3.1,0.007\n").unwrap();

        let mut app = app();
        app.selected = 4;
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.shown.as_deref(), Some("Central"));

        picker_for(&mut app, PickerTarget::Parameters, path);
        app.handle_key(KeyCode::Enter);
        assert!(app.picker.is_none());
        assert_eq!(app.status, STATUS_CUSTOM);
        assert!(!app.status_is_error);
        assert_eq!(app.selected, 0);
        assert!(app.shown.is_none());

        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.status, STATUS_DEFAULT);
        assert!(app.session.is_default());
    }

    #[test]
    fn failed_load_keeps_the_current_set_and_reports_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "id,b0,b1\nX,1,2\n").unwrap();

        let mut app = app();
        picker_for(&mut app, PickerTarget::Parameters, path);
        app.handle_key(KeyCode::Enter);

        assert!(app.status_is_error);
        assert!(app.status.contains("b2"), "{}", app.status);
        assert!(app.status.contains("Keeping bundled defaults"));
        assert!(app.session.is_default());
        assert_eq!(app.session.parameters().len(), 5);
    }

    #[test]
    fn observations_load_through_the_picker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        std::fs::write(&path, "id,t,observed\nNorth,100,150\nNorth,x,1\n").unwrap();

        let mut app = app();
        picker_for(&mut app, PickerTarget::Observations, path);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.status, "Loaded 1 observation(s) from obs.csv (1 skipped).");

        picker_for(&mut app, PickerTarget::Observations, dir.path().join("missing.csv"));
        app.handle_key(KeyCode::Esc);
        assert!(app.picker.is_none());
        assert_eq!(app.status, "Canceled.");
    }

    #[test]
    fn chart_series_splits_at_non_finite_points() {
        let curve = GrowthCurve {
            params: CurveParameters {
                id: "x".to_string(),
                b0: 1.0,
                b1: 1.0,
                b2: 1.0,
            },
            points: vec![(0.0, 1.0), (1.0, 2.0), (2.0, f64::NAN), (3.0, 4.0)],
        };
        let series = chart_series(&curve, &[], None).unwrap();
        assert_eq!(series.segments, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(3.0, 4.0)]]);
        assert_eq!(series.x_bounds, [0.0, 3.0]);
        assert!(series.y_bounds[0] < 1.0 && series.y_bounds[1] > 4.0);
    }

    #[test]
    fn chart_series_is_none_when_nothing_is_finite() {
        let p = CurveParameters {
            id: "nan".to_string(),
            b0: 1.0,
            b1: f64::NAN,
            b2: 1.0,
        };
        assert!(chart_series(&evaluate(&p, &[0.0, 1.0]), &[], None).is_none());
    }

    #[test]
    fn centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let r = centered_rect(area, 60, 50);
        assert_eq!(r, Rect::new(20, 10, 60, 20));
    }
}
