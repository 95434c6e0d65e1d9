use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};
use std::collections::HashSet;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

use stmtconv_core::{EditField, ExportSettings, LedgerSource, Session, Severity, export_file_name};
use stmtconv_ingest::{
    ExtractionEvent, ExtractionRequest, Gateway, GeminiExtractor, StatementDocument, run_worker,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    Edit { buffer: String },
    Open { buffer: String },
}

/// What the loop has to do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Open(PathBuf),
    Export,
}

struct App {
    session: Session,
    settings: ExportSettings,
    row: usize,
    column: usize,
    mode: Mode,
    message: Option<(String, Color)>,
}

impl App {
    fn new(settings: ExportSettings) -> Self {
        Self {
            session: Session::new(),
            settings,
            row: 0,
            column: 0,
            mode: Mode::Browse,
            message: None,
        }
    }

    fn field(&self) -> EditField {
        EditField::TABLE[self.column]
    }

    fn selected_id(&self) -> Option<String> {
        self.session
            .ledger()
            .records()
            .get(self.row)
            .map(|r| r.id.clone())
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.message = Some((msg.into(), Color::Gray));
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.message = Some((msg.into(), Color::Red));
    }

    fn handle_key(&mut self, code: KeyCode) -> Action {
        self.message = None;
        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => self.browse_key(code),
            Mode::Edit { mut buffer } => {
                match code {
                    KeyCode::Enter => self.commit_edit(&buffer),
                    KeyCode::Esc => self.info("edit cancelled"),
                    KeyCode::Backspace => {
                        buffer.pop();
                        self.mode = Mode::Edit { buffer };
                    }
                    KeyCode::Char(c) => {
                        buffer.push(c);
                        self.mode = Mode::Edit { buffer };
                    }
                    _ => self.mode = Mode::Edit { buffer },
                }
                Action::None
            }
            Mode::Open { mut buffer } => match code {
                KeyCode::Enter => {
                    let path = buffer.trim();
                    if path.is_empty() {
                        Action::None
                    } else {
                        Action::Open(PathBuf::from(path))
                    }
                }
                KeyCode::Esc => Action::None,
                KeyCode::Backspace => {
                    buffer.pop();
                    self.mode = Mode::Open { buffer };
                    Action::None
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    self.mode = Mode::Open { buffer };
                    Action::None
                }
                _ => {
                    self.mode = Mode::Open { buffer };
                    Action::None
                }
            },
        }
    }

    fn browse_key(&mut self, code: KeyCode) -> Action {
        let rows = self.session.ledger().len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => self.row = self.row.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.row + 1 < rows {
                    self.row += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.column = self.column.saturating_sub(1),
            KeyCode::Right | KeyCode::Char('l') => {
                if self.column + 1 < EditField::TABLE.len() {
                    self.column += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if self.session.is_processing() {
                    self.info("still processing");
                } else if let Some(r) = self.session.ledger().records().get(self.row) {
                    let buffer = self.field().current_text(r);
                    self.mode = Mode::Edit { buffer };
                }
            }
            KeyCode::Char('v') => {
                if let Some(id) = self.selected_id() {
                    let now_valid = self
                        .session
                        .ledger()
                        .get(&id)
                        .map(|r| !r.is_valid)
                        .unwrap_or(true);
                    if let Err(e) = self.session.set_validity(&id, now_valid) {
                        self.error(e.to_string());
                    }
                }
            }
            KeyCode::Char('o') => {
                self.mode = Mode::Open {
                    buffer: String::new(),
                };
            }
            KeyCode::Char('r') => {
                self.session.reset();
                self.row = 0;
                self.info("cleared; press o to open a statement");
            }
            KeyCode::Char('x') => return Action::Export,
            _ => {}
        }
        Action::None
    }

    fn commit_edit(&mut self, value: &str) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let field = self.field();
        match self.session.edit(&id, field, value) {
            Ok(()) => self.info(format!("{} {} updated", id, field)),
            Err(e) => self.error(e.to_string()),
        }
    }

    /// Accept a document and hand back the request to queue.
    fn open(&mut self, path: &Path) -> Option<ExtractionRequest> {
        match StatementDocument::from_path(path) {
            Ok(document) => {
                let request_id = self.session.begin(document.name());
                self.row = 0;
                self.info(format!("processing {}...", document.name()));
                Some(ExtractionRequest {
                    request_id,
                    document,
                })
            }
            Err(e) => {
                self.error(e.to_string());
                None
            }
        }
    }

    fn on_event(&mut self, ev: ExtractionEvent) {
        match ev {
            ExtractionEvent::Started { request_id } => {
                log::debug!("extraction {request_id} started");
            }
            ExtractionEvent::Finished {
                request_id,
                outcome,
            } => {
                let rows = outcome.records.len();
                if self.session.finish(request_id, outcome) {
                    self.row = 0;
                    self.info(format!("{rows} transactions loaded"));
                }
            }
        }
    }

    fn export(&mut self) -> Result<()> {
        if self.session.ledger().is_empty() {
            self.info("nothing to export");
            return Ok(());
        }
        let csv = self.session.export(&self.settings)?;
        let path = PathBuf::from(export_file_name(chrono::Local::now().date_naive()));
        std::fs::write(&path, csv)?;
        let rows = self.settings.row_count(self.session.ledger().records());
        self.info(format!("exported {} rows to {}", rows, path.display()));
        Ok(())
    }
}

/// Puts the terminal and log level back however the review exits.
struct TerminalGuard {
    log_level: log::LevelFilter,
    raw: bool,
}

impl TerminalGuard {
    /// stderr would draw over the alternate screen, so logging is off until
    /// the guard drops; warnings are shown in the UI instead.
    fn new() -> Self {
        let log_level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        Self {
            log_level,
            raw: false,
        }
    }

    fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        self.raw = true;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        }
        log::set_max_level(self.log_level);
    }
}

pub fn run_review(
    handle: tokio::runtime::Handle,
    gateway: Gateway<GeminiExtractor>,
    settings: ExportSettings,
    initial: Option<PathBuf>,
) -> Result<()> {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();
    let worker = handle.spawn(run_worker(Arc::new(gateway), req_rx, ev_tx));

    let mut app = App::new(settings);
    if let Some(p) = initial {
        if let Some(req) = app.open(&p) {
            let _ = req_tx.send(req);
        }
    }

    let res = run_terminal(&mut app, &req_tx, &ev_rx);

    drop(req_tx);
    worker.abort();
    res
}

fn run_terminal(
    app: &mut App,
    req_tx: &mpsc::UnboundedSender<ExtractionRequest>,
    ev_rx: &Receiver<ExtractionEvent>,
) -> Result<()> {
    let mut guard = TerminalGuard::new();
    guard.enter()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let res = review_loop(&mut terminal, app, req_tx, ev_rx);
    terminal.show_cursor()?;
    res
}

fn review_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    req_tx: &mpsc::UnboundedSender<ExtractionRequest>,
    ev_rx: &Receiver<ExtractionEvent>,
) -> Result<()> {
    loop {
        loop {
            match ev_rx.try_recv() {
                Ok(ev) => app.on_event(ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if app.session.is_processing() {
                        app.error("extraction worker stopped");
                    }
                    break;
                }
            }
        }

        terminal.draw(|f| draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(key.code) {
                    Action::None => {}
                    Action::Quit => break,
                    Action::Open(p) => {
                        if let Some(req) = app.open(&p) {
                            if req_tx.send(req).is_err() {
                                app.error("extraction worker stopped");
                            }
                        }
                    }
                    Action::Export => {
                        if let Err(e) = app.export() {
                            app.error(format!("export failed: {e:#}"));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    // header
    let doc = app.session.document().unwrap_or("no statement loaded");
    let status = if app.session.is_processing() {
        Span::styled("processing...", Style::default().fg(Color::Yellow))
    } else {
        match app.session.source() {
            Some(LedgerSource::Demo) => Span::styled("DEMO DATA", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Some(LedgerSource::Extracted) => Span::styled("extracted", Style::default().fg(Color::Green)),
            None => Span::raw(""),
        }
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("stmtconv ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("{doc}  ")),
        status,
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    // validation banner + notice
    let mut banner: Vec<Line> = Vec::new();
    match app.session.validation() {
        Some(s) => {
            let color = match s.severity() {
                Severity::Info => Color::Green,
                Severity::Warning => Color::Yellow,
                Severity::Error => Color::Red,
            };
            banner.push(Line::from(Span::styled(s.headline(), Style::default().fg(color))));
            banner.push(Line::raw(format!(
                "debits {:.2}  credits {:.2}  |  {} valid, {} need review",
                s.total_debits,
                s.total_credits,
                app.session.ledger().valid_count(),
                app.session.ledger().needs_review_count()
            )));
        }
        None => banner.push(Line::raw("No transaction data available")),
    }
    if let Some(n) = app.session.notice() {
        banner.push(Line::from(Span::styled(
            format!("warning: {n}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    let banner = Paragraph::new(banner)
        .block(Block::default().borders(Borders::ALL).title("balance check"))
        .wrap(Wrap { trim: true });
    f.render_widget(banner, chunks[1]);

    // ledger table
    let ledger = app.session.ledger();
    let broken: HashSet<usize> = ledger.chain_breaks().iter().map(|b| b.index).collect();
    let rows = ledger.records().iter().enumerate().map(|(i, r)| {
        let mut cells: Vec<Cell> = EditField::TABLE
            .iter()
            .enumerate()
            .map(|(c, field)| {
                let text = match (&app.mode, i == app.row && c == app.column) {
                    (Mode::Edit { buffer }, true) => format!("{buffer}_"),
                    _ => field.current_text(r),
                };
                let cell = Cell::from(text);
                if i == app.row && c == app.column {
                    cell.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    cell
                }
            })
            .collect();
        cells.push(Cell::from(if r.is_valid { "ok" } else { "review" }));

        let style = if broken.contains(&i) {
            Style::default().fg(Color::Red)
        } else if !r.is_valid {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Row::new(cells).style(style)
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(14),
        Constraint::Length(7),
    ];
    let header_row = Row::new(
        ["Date", "Description", "Debit", "Credit", "Balance", "Category", "Status"]
            .into_iter()
            .map(Cell::from),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths)
        .header(header_row)
        .block(Block::default().borders(Borders::ALL).title("transactions"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD));
    let mut state = TableState::default();
    if !ledger.is_empty() {
        state.select(Some(app.row));
    }
    f.render_stateful_widget(table, chunks[2], &mut state);

    // footer
    let footer = match &app.mode {
        Mode::Open { buffer } => Line::from(vec![
            Span::styled("open PDF: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{buffer}_")),
        ]),
        Mode::Edit { .. } => Line::from(Span::styled(
            format!("editing {}: Enter=save Esc=cancel", app.field()),
            Style::default().fg(Color::Cyan),
        )),
        Mode::Browse => match &app.message {
            Some((m, color)) => Line::from(Span::styled(m.clone(), Style::default().fg(*color))),
            None => Line::from(Span::styled(
                "arrows=move e=edit v=toggle review o=open r=reset x=export q=quit",
                Style::default().fg(Color::Gray),
            )),
        },
    };
    f.render_widget(
        Paragraph::new(footer).block(Block::default().borders(Borders::ALL)),
        chunks[3],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use stmtconv_core::{ExtractionOutcome, TransactionRecord};

    fn loaded() -> App {
        let mut app = App::new(ExportSettings::default());
        let id = app.session.begin("june.pdf");
        app.on_event(ExtractionEvent::Finished {
            request_id: id,
            outcome: ExtractionOutcome::extracted(vec![
                TransactionRecord::new("1", "2024-01-15", "Opening", 0.0, 0.0, 1000.0),
                TransactionRecord::new("2", "2024-01-16", "Deposit", 0.0, 500.0, 1500.0),
                TransactionRecord::new("3", "2024-01-17", "Grocery", 200.0, 0.0, 1300.0),
            ]),
        });
        app
    }

    fn type_text(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_edit_cell_and_save() {
        let mut app = loaded();
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        // date, description, debit
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.field(), EditField::Debit);

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.mode, Mode::Edit { buffer: "200".into() });
        for _ in 0..3 {
            app.handle_key(KeyCode::Backspace);
        }
        type_text(&mut app, "250");
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.session.ledger().get("3").unwrap().debit, 250.0);
        assert!(!app.session.validation().unwrap().is_valid);
    }

    #[test]
    fn test_escape_cancels_edit() {
        let mut app = loaded();
        app.handle_key(KeyCode::Char('e'));
        type_text(&mut app, "garbage");
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.session.ledger().get("1").unwrap().date, "2024-01-15");
    }

    #[test]
    fn test_toggle_validity() {
        let mut app = loaded();
        app.handle_key(KeyCode::Char('v'));
        assert!(!app.session.ledger().get("1").unwrap().is_valid);
        app.handle_key(KeyCode::Char('v'));
        assert!(app.session.ledger().get("1").unwrap().is_valid);
    }

    #[test]
    fn test_cursor_stays_inside_table() {
        let mut app = loaded();
        for _ in 0..10 {
            app.handle_key(KeyCode::Down);
            app.handle_key(KeyCode::Right);
        }
        assert_eq!(app.row, 2);
        assert_eq!(app.column, EditField::TABLE.len() - 1);
        app.handle_key(KeyCode::Up);
        assert_eq!(app.row, 1);
    }

    #[test]
    fn test_open_prompt_returns_path() {
        let mut app = loaded();
        app.handle_key(KeyCode::Char('o'));
        type_text(&mut app, "statements/july.pdf");
        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Action::Open(PathBuf::from("statements/july.pdf"))
        );
    }

    #[test]
    fn test_open_rejects_non_pdf_and_keeps_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("notes.txt");
        std::fs::write(&p, "hello").unwrap();

        let mut app = loaded();
        assert!(app.open(&p).is_none());
        assert_eq!(app.session.ledger().len(), 3);
        assert_eq!(app.message.as_ref().unwrap().1, Color::Red);
    }

    #[test]
    fn test_stale_result_after_reset_is_ignored() {
        let mut app = App::new(ExportSettings::default());
        let id = app.session.begin("a.pdf");
        app.handle_key(KeyCode::Char('r'));
        app.on_event(ExtractionEvent::Finished {
            request_id: id,
            outcome: ExtractionOutcome::extracted(vec![TransactionRecord::new(
                "1", "2024-01-15", "x", 0.0, 0.0, 1.0,
            )]),
        });
        assert!(app.session.ledger().is_empty());
    }

    #[test]
    fn test_message_clears_on_next_key() {
        let mut app = loaded();
        app.handle_key(KeyCode::Char('v'));
        app.handle_key(KeyCode::Char('e'));
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.message.as_ref().unwrap().0, "edit cancelled");

        app.handle_key(KeyCode::Down);
        assert!(app.message.is_none());
    }

    #[test]
    fn test_terminal_guard_restores_log_level() {
        log::set_max_level(log::LevelFilter::Info);
        {
            let _guard = TerminalGuard::new();
            assert_eq!(log::max_level(), log::LevelFilter::Off);
        }
        assert_eq!(log::max_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_quit() {
        let mut app = loaded();
        assert_eq!(app.handle_key(KeyCode::Char('q')), Action::Quit);
    }
}
