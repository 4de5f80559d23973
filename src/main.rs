use std::fs::File;
use std::io;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use matchup_terminal::classifier::{Classifier, ModelArtifact};
use matchup_terminal::config::{AppConfig, load_dotenv};
use matchup_terminal::history_export::export_service_history;
use matchup_terminal::outcome::Prob3;
use matchup_terminal::pipeline::load_service;
use matchup_terminal::service::PredictionService;
use matchup_terminal::view::{EMPTY_HISTORY_MESSAGE, HistoryRow, PredictionView, on_predict, on_show_history};

const MAX_CONSOLE_LINES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Predict,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Picker {
    Home,
    Away,
}

enum LoadState {
    Loading,
    Ready(PredictionService),
    Failed(String),
}

struct App {
    config: AppConfig,
    load: LoadState,
    teams: Vec<String>,
    home_idx: usize,
    away_idx: usize,
    focus: Picker,
    screen: Screen,
    last_view: Option<PredictionView>,
    history_selected: usize,
    help_overlay: bool,
    console: Vec<String>,
    should_quit: bool,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            load: LoadState::Loading,
            teams: Vec::new(),
            home_idx: 0,
            away_idx: 1,
            focus: Picker::Home,
            screen: Screen::Predict,
            last_view: None,
            history_selected: 0,
            help_overlay: false,
            console: Vec::new(),
            should_quit: false,
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        self.console.push(line.into());
        if self.console.len() > MAX_CONSOLE_LINES {
            let drop = self.console.len() - MAX_CONSOLE_LINES;
            self.console.drain(..drop);
        }
    }

    fn on_loaded(&mut self, result: Result<PredictionService, String>) {
        match result {
            Ok(service) => {
                self.teams = service.teams();
                self.home_idx = 0;
                self.away_idx = if self.teams.len() > 1 { 1 } else { 0 };
                self.push_log(format!(
                    "[INFO] Season {} ready: {} teams",
                    self.config.season,
                    self.teams.len()
                ));
                self.load = LoadState::Ready(service);
            }
            Err(err) => {
                self.push_log("[WARN] Season load failed");
                self.load = LoadState::Failed(err);
            }
        }
    }

    fn service(&self) -> Option<&PredictionService> {
        match &self.load {
            LoadState::Ready(service) => Some(service),
            _ => None,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.screen = match self.screen {
                    Screen::Predict => Screen::History,
                    Screen::History => Screen::Predict,
                };
                self.history_selected = 0;
            }
            KeyCode::Char('b') | KeyCode::Esc => self.screen = Screen::Predict,
            KeyCode::Char('x') | KeyCode::Char('X') => self.export_history(),
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
                self.focus = match self.focus {
                    Picker::Home => Picker::Away,
                    Picker::Away => Picker::Home,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Enter | KeyCode::Char('p') => self.predict(),
            _ => {}
        }
    }

    fn move_selection(&mut self, step: isize) {
        let (idx, total) = match self.screen {
            Screen::History => {
                let total = self.service().map(|s| s.history_len()).unwrap_or(0);
                (&mut self.history_selected, total)
            }
            Screen::Predict => {
                let total = self.teams.len();
                match self.focus {
                    Picker::Home => (&mut self.home_idx, total),
                    Picker::Away => (&mut self.away_idx, total),
                }
            }
        };
        if total == 0 {
            return;
        }
        *idx = (*idx as isize + step).clamp(0, total as isize - 1) as usize;
    }

    fn predict(&mut self) {
        if self.screen != Screen::Predict {
            return;
        }
        let (Some(home), Some(away)) = (
            self.teams.get(self.home_idx).cloned(),
            self.teams.get(self.away_idx).cloned(),
        ) else {
            self.push_log("[INFO] No teams loaded");
            return;
        };
        let Some(service) = self.service() else {
            self.push_log("[INFO] Season not loaded yet");
            return;
        };
        let view = on_predict(service, &home, &away);
        self.last_view = Some(view);
    }

    fn export_history(&mut self) {
        let path = self.config.history_export_path.clone();
        let Some(service) = self.service() else {
            self.push_log("[INFO] Nothing to export yet");
            return;
        };
        match export_service_history(&path, service) {
            Ok(report) => self.push_log(format!(
                "[INFO] Exported {} predictions to {}",
                report.predictions,
                path.display()
            )),
            Err(err) => {
                log::warn!("history export failed: {err:#}");
                self.push_log("[WARN] History export failed");
            }
        }
    }
}

fn init_file_logger(config: &AppConfig) {
    let Ok(file) = File::create(&config.log_path) else {
        return;
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}

fn spawn_season_loader(config: AppConfig, tx: mpsc::Sender<Result<PredictionService, String>>) {
    thread::spawn(move || {
        let result = ModelArtifact::load(&config.model_path)
            .map_err(|err| format!("model {}: {err}", config.model_path.display()))
            .and_then(|model| {
                let classifier: Arc<dyn Classifier> = Arc::new(model);
                let source = config.season_source();
                load_service(
                    source.as_ref(),
                    &config.season,
                    &config.merge_categories,
                    classifier,
                )
                .map_err(|err| format!("season {}: {err}", config.season))
            });
        if let Err(err) = &result {
            log::error!("{err}");
        }
        let _ = tx.send(result);
    });
}

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let config = AppConfig::from_env()?;
    init_file_logger(&config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    spawn_season_loader(config.clone(), tx);

    let mut app = App::new(config);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Result<PredictionService, String>>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        if let Ok(loaded) = rx.try_recv() {
            app.on_loaded(loaded);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(MAX_CONSOLE_LINES as u16 + 1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match &app.load {
        LoadState::Loading => {
            let msg = Paragraph::new(format!(
                "Loading season {} from {:?}...",
                app.config.season, app.config.stats_source
            ))
            .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, chunks[1]);
        }
        LoadState::Failed(err) => {
            let msg = Paragraph::new(format!("Could not load this season's statistics.\n\n{err}"))
                .style(Style::default().fg(Color::Red));
            frame.render_widget(msg, chunks[1]);
        }
        LoadState::Ready(service) => match app.screen {
            Screen::Predict => render_predict(frame, chunks[1], app),
            Screen::History => render_history(frame, chunks[1], app, service),
        },
    }

    let console = Paragraph::new(app.console.join("\n"))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP).title("Console"));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(app.screen))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let screen = match app.screen {
        Screen::Predict => "Predict",
        Screen::History => "History",
    };
    let count = app.service().map(|s| s.history_len()).unwrap_or(0);
    format!(
        "MATCHUP TERMINAL | Season {} | {screen} | {count} predictions",
        app.config.season
    )
}

fn footer_text(screen: Screen) -> &'static str {
    match screen {
        Screen::Predict => {
            "Tab/←/→ Switch side | j/k/↑/↓ Team | Enter Predict | h History | x Export | ? Help | q Quit"
        }
        Screen::History => "j/k/↑/↓ Scroll | h/b/Esc Back | x Export | ? Help | q Quit",
    }
}

fn render_predict(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(28),
            Constraint::Percentage(44),
        ])
        .split(area);

    render_team_picker(frame, columns[0], app, Picker::Home);
    render_team_picker(frame, columns[1], app, Picker::Away);

    let panel = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(columns[2]);

    let text = app
        .last_view
        .as_ref()
        .map(|v| v.text.clone())
        .unwrap_or_else(|| "Pick two teams and press Enter.".to_string());
    let text_style = match app.last_view.as_ref() {
        Some(v) if v.proportions.is_none() => Style::default().fg(Color::Red),
        _ => Style::default(),
    };
    let result = Paragraph::new(text)
        .style(text_style)
        .block(Block::default().borders(Borders::ALL).title("Result"));
    frame.render_widget(result, panel[0]);

    let chart_block = Block::default().borders(Borders::ALL).title("Probabilities");
    match app.last_view.as_ref().and_then(|v| v.proportions) {
        Some(p) => {
            let inner = chart_block.inner(panel[1]);
            frame.render_widget(chart_block, panel[1]);
            frame.render_widget(outcome_bar_chart(&p), inner);
        }
        None => frame.render_widget(chart_block, panel[1]),
    }
}

fn render_team_picker(frame: &mut Frame, area: Rect, app: &App, side: Picker) {
    let (title, selected) = match side {
        Picker::Home => ("Home", app.home_idx),
        Picker::Away => ("Away", app.away_idx),
    };
    let focused = app.focus == side;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (start, end) = visible_range(selected, app.teams.len(), inner.height as usize);
    let lines: Vec<Line> = app.teams[start..end]
        .iter()
        .enumerate()
        .map(|(offset, team)| {
            let style = if start + offset == selected {
                let base = Style::default().add_modifier(Modifier::REVERSED);
                if focused { base.fg(Color::Cyan) } else { base }
            } else {
                Style::default()
            };
            Line::styled(team.clone(), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn outcome_bar_chart(p: &Prob3) -> BarChart<'static> {
    let bar = |label: &'static str, value: f64, color: Color| {
        Bar::default()
            .label(Line::from(label))
            .value((value * 100.0).round() as u64)
            .text_value(format!("{:.1}%", value * 100.0))
            .style(Style::default().fg(color))
    };

    BarChart::default()
        .data(BarGroup::default().bars(&[
            bar("Home Win", p.home, Color::Green),
            bar("Draw", p.draw, Color::Yellow),
            bar("Away Win", p.away, Color::Red),
        ]))
        .bar_width(10)
        .bar_gap(3)
        .max(100)
}

fn history_bar_chart(p: &Prob3, selected: bool) -> BarChart<'static> {
    let base_bg = if selected { Some(Color::DarkGray) } else { None };

    let mut home_style = Style::default().fg(Color::Green);
    let mut draw_style = Style::default().fg(Color::Yellow);
    let mut away_style = Style::default().fg(Color::Red);
    if let Some(bg) = base_bg {
        home_style = home_style.bg(bg);
        draw_style = draw_style.bg(bg);
        away_style = away_style.bg(bg);
    }

    let bars = [
        (p.home, home_style),
        (p.draw, draw_style),
        (p.away, away_style),
    ]
    .map(|(value, style)| {
        Bar::default()
            .value((value * 100.0).round() as u64)
            .text_value(String::new())
            .style(style)
    });

    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn render_history(frame: &mut Frame, area: Rect, app: &App, service: &PredictionService) {
    let rows: Vec<HistoryRow> = on_show_history(service);
    if rows.is_empty() {
        let empty = Paragraph::new(EMPTY_HISTORY_MESSAGE).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    const ROW_HEIGHT: u16 = 3;
    let visible = (area.height / ROW_HEIGHT).max(1) as usize;
    let (start, end) = visible_range(app.history_selected, rows.len(), visible);
    for (slot, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: area.x,
            y: area.y + slot as u16 * ROW_HEIGHT,
            width: area.width,
            height: ROW_HEIGHT.min(area.height.saturating_sub(slot as u16 * ROW_HEIGHT)),
        };
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(30), Constraint::Length(32)])
            .split(row_area);

        let selected = idx == app.history_selected;
        let style = if selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let text = format!("{:>3}. {}", idx + 1, rows[idx].summary());
        frame.render_widget(Paragraph::new(text).style(style), cols[0]);
        frame.render_widget(history_bar_chart(&rows[idx].probabilities, selected), cols[1]);
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchup Terminal - Help",
        "",
        "Predict:",
        "  Tab / ← / →  Switch home/away picker",
        "  j/k or ↑/↓   Choose team",
        "  Enter / p    Predict outcome",
        "",
        "Global:",
        "  h            Toggle history",
        "  b / Esc      Back",
        "  x            Export history to xlsx",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
