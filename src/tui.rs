use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::Duration;

use crate::app::Tracker;
use crate::models::{format_date, JobRecord, RecordEdit, Status, MAX_RATING};
use crate::notify::Toasts;

const TICK: Duration = Duration::from_millis(250);

struct AppState {
    records: Vec<JobRecord>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(records: Vec<JobRecord>) -> Self {
        Self {
            records,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current(&self) -> Option<&JobRecord> {
        self.records.get(self.selected)
    }

    /// Swaps in a freshly sorted list, keeping the cursor on the same record
    /// when it still exists.
    fn replace(&mut self, records: Vec<JobRecord>) {
        let current_id = self.current().map(|r| r.id);
        self.records = records;
        self.selected = current_id
            .and_then(|id| self.records.iter().position(|r| r.id == id))
            .unwrap_or_else(|| self.selected.min(self.records.len().saturating_sub(1)));
        self.scroll_offset = 0;
    }

    fn next(&mut self) {
        if !self.records.is_empty() && self.selected < self.records.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

pub fn run_browse(tracker: &mut Tracker, toasts: &Toasts) -> Result<()> {
    let mut state = AppState::new(tracker.load());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, tracker, toasts);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn edit_current(state: &mut AppState, tracker: &mut Tracker, edit: RecordEdit) {
    let Some(id) = state.current().map(|r| r.id) else { return };
    if tracker.begin_edit(id).is_some() && tracker.save_edit(&edit).is_none() {
        tracker.cancel_edit();
    }
    state.replace(tracker.load());
}

fn set_status(state: &mut AppState, tracker: &mut Tracker, status: Status) {
    edit_current(
        state,
        tracker,
        RecordEdit {
            status: Some(status),
            ..Default::default()
        },
    );
}

fn bump_rating(state: &mut AppState, tracker: &mut Tracker, delta: i64) {
    let Some(rating) = state.current().map(|r| r.likelihood_rating as i64) else { return };
    edit_current(
        state,
        tracker,
        RecordEdit {
            likelihood_rating: Some(rating + delta),
            ..Default::default()
        },
    );
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    tracker: &mut Tracker,
    toasts: &Toasts,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        let sort = tracker.session().sort;
        let backend = tracker.store_label();
        terminal.draw(|frame| draw(frame, state, &mut list_state, toasts, sort.as_str(), backend))?;

        // Poll so expired notifications disappear without a key press.
        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('s') => {
                    let next = tracker.session().sort.next();
                    let records = tracker.set_sort(next);
                    state.replace(records);
                }
                KeyCode::Char('a') => set_status(state, tracker, Status::Applied),
                KeyCode::Char('r') => set_status(state, tracker, Status::Recruiter),
                KeyCode::Char('i') => set_status(state, tracker, Status::Interview),
                KeyCode::Char('x') => set_status(state, tracker, Status::Rejected),
                KeyCode::Char('+') | KeyCode::Char('=') => bump_rating(state, tracker, 1),
                KeyCode::Char('-') => bump_rating(state, tracker, -1),
                KeyCode::Char('D') => {
                    if let Some(id) = state.current().map(|r| r.id) {
                        tracker.delete(id);
                        state.replace(tracker.load());
                    }
                }
                KeyCode::Char('g') => state.replace(tracker.load()),
                _ => {}
            }
            list_state.select(if state.records.is_empty() { None } else { Some(state.selected) });
        }
    }
    Ok(())
}

fn status_style(status: &Status) -> Style {
    match status {
        Status::Applied => Style::default().fg(Color::Cyan),
        Status::Recruiter => Style::default().fg(Color::Yellow),
        Status::Interview => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
        Status::Other(_) => Style::default().fg(Color::DarkGray),
    }
}

fn stars(rating: u8) -> String {
    (1..=MAX_RATING)
        .map(|i| if i <= rating { '★' } else { '☆' })
        .collect()
}

fn draw(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    toasts: &Toasts,
    sort: &str,
    backend: &str,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(60),
        ])
        .split(rows[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .records
        .iter()
        .map(|record| {
            let company = if record.job_name.chars().count() > 24 {
                format!("{}...", record.job_name.chars().take(21).collect::<String>())
            } else {
                record.job_name.clone()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<10} ", record.status.as_str()), status_style(&record.status)),
                Span::raw(format!("{} ", stars(record.likelihood_rating))),
                Span::raw(company),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}) | sort: {} | {} ",
            state.records.len(),
            sort,
            backend
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail_width = chunks[1].width.saturating_sub(4).max(20) as usize;
    let detail = Paragraph::new(build_detail(state, detail_width))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail, chunks[1]);

    // Footer: latest notification, otherwise key help
    let footer = match toasts.active() {
        Some(message) => Paragraph::new(format!(" {}", message))
            .style(Style::default().fg(Color::Black).bg(Color::LightBlue)),
        None => Paragraph::new(
            " j/k:move J/K:scroll s:sort a/r/i/x:status +/-:rating D:delete g:reload q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[1]);
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<15}", label), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn build_detail(state: &AppState, width: usize) -> Text<'_> {
    let Some(record) = state.current() else {
        return Text::raw("No job applications yet. Add one with: jobtrack add");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        record.job_name.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(record.position.as_str()));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", record.status),
        status_style(&record.status),
    )));
    if record.likelihood_rating > 0 {
        lines.push(Line::from(format!(
            "{} {}/{}",
            stars(record.likelihood_rating),
            record.likelihood_rating,
            MAX_RATING
        )));
    }
    lines.push(Line::from(""));

    let contacts = record.contacts();
    lines.push(field("Location", record.location.clone()));
    lines.push(field("Pay", record.pay.clone()));
    lines.push(field("Date Applied", format_date(&record.date_applied)));
    lines.push(field(
        "Contacts",
        if contacts.is_empty() { "N/A".to_string() } else { contacts.join(", ") },
    ));
    if let Some(phone) = &record.contact_phone {
        lines.push(field("Phone", phone.clone()));
    }
    lines.push(field("Source", record.source.clone()));
    lines.push(field(
        "Website",
        if record.job_url.is_empty() { "N/A".to_string() } else { record.job_url.clone() },
    ));
    lines.push(field("Follow Up Date", format_date(&record.follow_up_date)));
    lines.push(field("ID", record.id.to_string()));

    if record.has_notes() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&record.notes, width).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}
