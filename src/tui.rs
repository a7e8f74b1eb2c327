use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::guard::{Outcome, Page, Route, RouteGuard};
use crate::models::{AiShortlistResult, Candidate};
use crate::tasks::Tasks;
use crate::view::{CandidateView, Tab, format_date, format_score, group_skills};

const TICK: Duration = Duration::from_millis(250);

enum Msg {
    Loaded(ApiResult<Vec<Candidate>>),
    Toggled {
        id: i64,
        previous: bool,
        result: ApiResult<bool>,
    },
    Ranked(ApiResult<AiShortlistResult>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Search,
    Ranking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseExit {
    Quit,
    SessionEnded,
}

struct AppState {
    view: CandidateView,
    selected: usize,
    scroll_offset: u16,
    mode: Mode,
    status: Option<String>,
    loading: bool,
    profile_completed: bool,
    threshold: f64,
    ranking: Option<AiShortlistResult>,
    ranking_selected: usize,
}

impl AppState {
    fn new(profile_completed: bool, threshold: f64) -> Self {
        Self {
            view: CandidateView::default(),
            selected: 0,
            scroll_offset: 0,
            mode: Mode::Normal,
            status: None,
            loading: true,
            profile_completed,
            threshold,
            ranking: None,
            ranking_selected: 0,
        }
    }

    fn current(&self) -> Option<&Candidate> {
        self.view.visible().get(self.selected)
    }

    fn clamp_selection(&mut self) {
        let len = self.view.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn next(&mut self) {
        if !self.view.visible().is_empty() && self.selected < self.view.visible().len() - 1 {
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

    fn set_tab(&mut self, tab: Tab) {
        self.view.set_tab(tab);
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn edit_term(&mut self, edit: impl FnOnce(&mut String)) {
        let mut term = self.view.term().to_string();
        edit(&mut term);
        self.view.set_term(&term);
        self.clamp_selection();
    }

    fn require_profile(&mut self) -> bool {
        if !self.profile_completed {
            self.status = Some(
                "Complete your job profile first: recruit company update ...".to_string(),
            );
        }
        self.profile_completed
    }

    fn apply(&mut self, msg: Msg) {
        match msg {
            Msg::Loaded(Ok(candidates)) => {
                self.loading = false;
                self.status = Some(format!("Loaded {} candidate(s)", candidates.len()));
                self.view.set_candidates(candidates);
                self.clamp_selection();
            }
            Msg::Loaded(Err(e)) => {
                self.loading = false;
                warn!(error = %e, "failed to load candidates");
                self.status = Some(format!("Failed to load candidates: {}", e));
            }
            Msg::Toggled {
                id,
                previous,
                result,
            } => {
                match self.view.finish_toggle(id, previous, result) {
                    Ok(true) => self.status = Some(format!("Candidate #{} shortlisted", id)),
                    Ok(false) => {
                        self.status = Some(format!("Candidate #{} removed from shortlist", id))
                    }
                    Err(e) => {
                        warn!(id, error = %e, "shortlist update failed");
                        self.status = Some(format!("Failed to update #{}: {}", id, e));
                    }
                }
                self.clamp_selection();
            }
            Msg::Ranked(Ok(_)) if self.mode != Mode::Ranking => {
                debug!("ranking overlay already closed; dropping result");
            }
            Msg::Ranked(Ok(result)) => {
                self.status = Some(format!(
                    "AI ranked {} candidate(s)",
                    result.total_candidates
                ));
                self.ranking = Some(result);
                self.ranking_selected = 0;
            }
            Msg::Ranked(Err(e)) => {
                if self.mode == Mode::Ranking {
                    self.mode = Mode::Normal;
                }
                self.status = Some(format!("AI ranking failed: {}", e));
            }
        }
    }
}

/// Background work for the browser. Reads (list loads, ranking runs) are
/// dropped on reload. Shortlist writes are not: their answer is what
/// confirms or rolls back the optimistic flip.
struct Workers {
    reads: Tasks<Msg>,
    writes: Tasks<Msg>,
}

impl Workers {
    fn new() -> Self {
        Self {
            reads: Tasks::new(),
            writes: Tasks::new(),
        }
    }

    fn drain(&self) -> Vec<Msg> {
        let mut messages = self.writes.drain();
        messages.extend(self.reads.drain());
        messages
    }

    fn pending(&self) -> usize {
        self.reads.pending() + self.writes.pending()
    }

    fn cancel_all(&mut self) {
        self.reads.cancel_all();
        self.writes.cancel_all();
    }
}

fn start_toggle(state: &mut AppState, workers: &Workers, client: &Arc<ApiClient>, id: i64) {
    if !state.require_profile() {
        return;
    }
    match state.view.begin_toggle(id) {
        Ok((previous, wanted)) => {
            let client = client.clone();
            workers.writes.spawn("shortlist", move || Msg::Toggled {
                id,
                previous,
                result: client
                    .update_shortlist_status(id, wanted)
                    .map(|echo| echo.shortlisted),
            });
            state.clamp_selection();
        }
        Err(e) => state.status = Some(e.to_string()),
    }
}

fn start_load(state: &mut AppState, workers: &Workers, client: &Arc<ApiClient>) {
    state.loading = true;
    let client = client.clone();
    workers
        .reads
        .spawn("load", move || Msg::Loaded(client.fetch_applied_candidates()));
}

/// Drops stale reads and fetches the list again. Shortlist writes in
/// flight keep running and still settle their records.
fn reload(state: &mut AppState, workers: &mut Workers, client: &Arc<ApiClient>) {
    workers.reads.cancel_all();
    start_load(state, workers, client);
}

fn start_rank(state: &mut AppState, workers: &Workers, client: &Arc<ApiClient>) {
    if !state.require_profile() {
        return;
    }
    state.mode = Mode::Ranking;
    state.ranking = None;
    let client = client.clone();
    let threshold = state.threshold;
    workers.reads.spawn("rank", move || {
        Msg::Ranked(client.rank_candidates_by_ai(threshold))
    });
}

pub fn run_browse(
    client: Arc<ApiClient>,
    mut guard: RouteGuard,
    profile_completed: bool,
    threshold: f64,
) -> Result<BrowseExit> {
    let mut state = AppState::new(profile_completed, threshold);
    let mut workers = Workers::new();
    start_load(&mut state, &workers, &client);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &mut workers, &client, &mut guard);

    // Leaving the screen: late answers must not land anywhere
    workers.cancel_all();

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    workers: &mut Workers,
    client: &Arc<ApiClient>,
    guard: &mut RouteGuard,
) -> Result<BrowseExit> {
    let mut list_state = ListState::default();

    loop {
        for msg in workers.drain() {
            state.apply(msg);
        }

        // Logout or a login as someone else, possibly from another process
        guard.refresh();
        if guard.resolve(Route::Dashboard) != Outcome::Render(Page::CompanyDashboard) {
            debug!(state = ?guard.state(), "session no longer a company login; closing browser");
            return Ok(BrowseExit::SessionEnded);
        }

        list_state.select(if state.view.visible().is_empty() {
            None
        } else {
            Some(state.selected)
        });
        let busy = workers.pending();
        terminal.draw(|frame| draw(frame, state, busy, &mut list_state, client))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match state.mode {
            Mode::Search => match key.code {
                KeyCode::Enter => state.mode = Mode::Normal,
                KeyCode::Esc => {
                    state.edit_term(|t| t.clear());
                    state.mode = Mode::Normal;
                }
                KeyCode::Backspace => state.edit_term(|t| {
                    t.pop();
                }),
                KeyCode::Char(c) => state.edit_term(|t| t.push(c)),
                _ => {}
            },

            Mode::Ranking => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => {
                    state.mode = Mode::Normal;
                    state.ranking = None;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let len = state.ranking.as_ref().map_or(0, |r| r.candidates.len());
                    if state.ranking_selected + 1 < len {
                        state.ranking_selected += 1;
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    state.ranking_selected = state.ranking_selected.saturating_sub(1);
                }
                KeyCode::Char('s') => {
                    let picked = state
                        .ranking
                        .as_ref()
                        .and_then(|r| r.candidates.get(state.ranking_selected))
                        .map(|c| c.candidate_id);
                    if let Some(id) = picked {
                        let already = state.view.get(id).map(|c| c.shortlisted);
                        match already {
                            Some(true) => {
                                state.status = Some(format!("Candidate #{} is already shortlisted", id))
                            }
                            Some(false) => start_toggle(state, workers, client, id),
                            None => state.status = Some(format!("Candidate #{} is not loaded", id)),
                        }
                    }
                }
                _ => {}
            },

            Mode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(BrowseExit::Quit),
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('1') => state.set_tab(Tab::All),
                KeyCode::Char('2') => state.set_tab(Tab::Shortlisted),
                KeyCode::Char('3') => state.set_tab(Tab::Pending),
                KeyCode::Tab => {
                    let next = state.view.tab().next();
                    state.set_tab(next);
                }
                KeyCode::Char('/') => state.mode = Mode::Search,
                KeyCode::Char('R') => reload(state, workers, client),
                KeyCode::Char('s') => {
                    if let Some(id) = state.current().map(|c| c.id) {
                        start_toggle(state, workers, client, id);
                    }
                }
                KeyCode::Char('a') => start_rank(state, workers, client),
                _ => {}
            },
        }
    }
}

fn draw(
    frame: &mut Frame,
    state: &AppState,
    busy: usize,
    list_state: &mut ListState,
    client: &ApiClient,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(Paragraph::new(build_header(state)), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    // Left panel: candidate list
    let items: Vec<ListItem> = state
        .view
        .visible()
        .iter()
        .map(|c| {
            let icon = if c.shortlisted { "*" } else { " " };
            let name = if c.fullname.chars().count() > 28 {
                format!("{}...", c.fullname.chars().take(25).collect::<String>())
            } else {
                c.fullname.clone()
            };
            ListItem::new(format!("{} #{:<4} {}", icon, c.id, name))
        })
        .collect();

    let title = if state.loading {
        " Candidates (loading...) ".to_string()
    } else {
        format!(" Candidates ({}) ", state.view.visible().len())
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: candidate detail
    let detail = Paragraph::new(build_detail(state, client))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    // Footer: status or help
    let mut footer = match (&state.status, state.mode) {
        (_, Mode::Search) => " type to search  Enter:keep  Esc:clear".to_string(),
        (_, Mode::Ranking) => " j/k:navigate  s:shortlist  Esc:close".to_string(),
        (Some(status), _) => format!(" {}", status),
        (None, _) => HELP.to_string(),
    };
    if busy > 0 {
        footer.push_str(&format!("  [{} request(s) in flight]", busy));
    }
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );

    if state.mode == Mode::Ranking {
        draw_ranking(frame, state);
    }
}

const HELP: &str =
    " j/k:navigate  J/K:scroll  1/2/3,Tab:tabs  /:search  s:shortlist  a:AI rank  R:reload  q:quit";

fn build_header(state: &AppState) -> Line<'static> {
    let counts = state.view.counts();
    let mut spans = Vec::new();
    for tab in Tab::ALL {
        let count = match tab {
            Tab::All => counts.all,
            Tab::Shortlisted => counts.shortlisted,
            Tab::Pending => counts.pending,
        };
        let style = if tab == state.view.tab() {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        spans.push(Span::styled(format!(" {} ({}) ", tab.label(), count), style));
        spans.push(Span::raw(" "));
    }

    let term = state.view.term();
    if state.mode == Mode::Search {
        spans.push(Span::styled(
            format!(" search: {}_", term),
            Style::default().fg(Color::Yellow),
        ));
    } else if !term.is_empty() {
        spans.push(Span::styled(
            format!(" search: {}", term),
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

fn build_detail<'a>(state: &'a AppState, client: &ApiClient) -> Text<'a> {
    let Some(c) = state.current() else {
        return Text::raw(if state.loading {
            "Loading candidates..."
        } else {
            "No candidates match"
        });
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &c.fullname,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let (status, status_style) = if c.shortlisted {
        ("Shortlisted", Style::default().fg(Color::Green))
    } else {
        ("Pending review", Style::default().fg(Color::Yellow))
    };
    lines.push(Line::from(Span::styled(status, status_style)));
    lines.push(Line::from(""));

    lines.push(Line::from(format!("Email: {}", c.email)));
    if let Some(phone) = &c.phone {
        lines.push(Line::from(format!("Phone: {}", phone)));
    }
    if let Some(location) = &c.location {
        lines.push(Line::from(format!("Location: {}", location)));
    }
    if let Some(years) = c.years_experience {
        lines.push(Line::from(format!("Experience: {} year(s)", years)));
    }
    lines.push(Line::from(format!(
        "Applied: {}",
        format_date(c.applied_date.as_deref())
    )));
    if let Some(url) = client.resume_download_url(c.resume_path.as_deref()) {
        lines.push(Line::from(format!("Resume: {}", url)));
    }
    lines.push(Line::from(""));

    // Skills
    if !c.skills.is_empty() {
        lines.push(Line::from(Span::styled(
            "Skills",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (category, skills) in group_skills(&c.skills) {
            lines.push(Line::from(Span::styled(
                format!("  {}", category.0.label()),
                Style::default().fg(Color::Cyan),
            )));
            for skill in skills {
                match skill.proficiency {
                    Some(level) => {
                        lines.push(Line::from(format!("    {} ({})", skill.skill_name, level)))
                    }
                    None => lines.push(Line::from(format!("    {}", skill.skill_name))),
                }
            }
        }
        lines.push(Line::from(""));
    }

    // Education
    if !c.education.is_empty() {
        lines.push(Line::from(Span::styled(
            "Education",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for edu in &c.education {
            let mut line = format!(
                "  {} - {}",
                edu.degree.as_deref().unwrap_or("?"),
                edu.institution.as_deref().unwrap_or("?")
            );
            if let Some(year) = edu.graduation_year {
                line.push_str(&format!(" ({})", year));
            }
            if let Some(gpa) = edu.gpa {
                line.push_str(&format!(" GPA {:.2}", gpa));
            }
            lines.push(Line::from(line));
        }
    }

    if c.skills.is_empty() && c.education.is_empty() {
        lines.push(Line::from(Span::styled(
            "(No parsed resume details)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_ranking(frame: &mut Frame, state: &AppState) {
    let area = popup_area(frame.area(), 80, 80);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" AI Shortlisting (threshold {}) ", state.threshold));

    let Some(result) = &state.ranking else {
        let waiting = Paragraph::new("Loading shortlisting results...").block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let width = area.width.saturating_sub(8).max(20) as usize;
    let mut lines: Vec<Line> = vec![
        Line::from(format!(
            "Total candidates analyzed: {}",
            result.total_candidates
        )),
        Line::from(""),
    ];

    for (i, ranked) in result.candidates.iter().enumerate() {
        let marker = if i == state.ranking_selected { "> " } else { "  " };
        let shortlisted = state
            .view
            .get(ranked.candidate_id)
            .is_some_and(|c| c.shortlisted);
        let style = if i == state.ranking_selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{}{:>2}. {} <{}>  match {}{}",
                marker,
                i + 1,
                ranked.fullname,
                ranked.email,
                format_score(ranked.aggregate_score),
                if shortlisted { "  [shortlisted]" } else { "" }
            ),
            style,
        )));
        lines.push(Line::from(format!(
            "      skills {}  experience {}",
            format_score(ranked.skill_score),
            format_score(ranked.experience_score)
        )));

        let matched = ranked.matched_skills();
        if !matched.is_empty() {
            for line in textwrap::fill(&format!("matched: {}", matched.join(", ")), width).lines() {
                lines.push(Line::from(Span::styled(
                    format!("      {}", line),
                    Style::default().fg(Color::Green),
                )));
            }
        }
        if !ranked.missing_skills().is_empty() {
            let text = format!("missing: {}", ranked.missing_skills().join(", "));
            for line in textwrap::fill(&text, width).lines() {
                lines.push(Line::from(Span::styled(
                    format!("      {}", line),
                    Style::default().fg(Color::Yellow),
                )));
            }
        }
    }

    let popup = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(popup, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::UserType;
    use crate::session::{MemorySessionStore, SessionStore};
    use httpmock::prelude::*;
    use serde_json::json;

    fn candidate(id: i64, shortlisted: bool) -> Candidate {
        Candidate {
            id,
            fullname: format!("Person {}", id),
            email: format!("p{}@example.com", id),
            phone: None,
            location: None,
            years_experience: None,
            resume_path: None,
            status: None,
            shortlisted,
            applied_date: None,
            education: Vec::new(),
            skills: Vec::new(),
        }
    }

    #[test]
    fn test_failed_toggle_message_rolls_back() {
        let mut state = AppState::new(true, 0.7);
        state.apply(Msg::Loaded(Ok(vec![candidate(1, false), candidate(2, true)])));

        let (previous, _) = state.view.begin_toggle(1).unwrap();
        assert!(state.view.get(1).unwrap().shortlisted);

        state.apply(Msg::Toggled {
            id: 1,
            previous,
            result: Err(ApiError::Api {
                status: 401,
                message: "Token has expired".to_string(),
            }),
        });

        assert!(!state.view.get(1).unwrap().shortlisted);
        assert!(state.status.as_deref().unwrap().contains("Token has expired"));
    }

    #[test]
    fn test_selection_stays_in_bounds_after_filtering() {
        let mut state = AppState::new(true, 0.7);
        state.apply(Msg::Loaded(Ok(vec![
            candidate(1, false),
            candidate(2, true),
            candidate(3, false),
        ])));
        state.selected = 2;

        state.set_tab(Tab::Shortlisted);
        assert_eq!(state.selected, 0);
        assert_eq!(state.current().map(|c| c.id), Some(2));

        state.set_tab(Tab::All);
        state.selected = 2;
        state.edit_term(|t| t.push_str("person 1"));
        assert_eq!(state.selected, 0);
        assert_eq!(state.current().map(|c| c.id), Some(1));
    }

    #[test]
    fn test_incomplete_profile_blocks_shortlisting() {
        let mut state = AppState::new(false, 0.7);
        state.apply(Msg::Loaded(Ok(vec![candidate(1, false)])));

        assert!(!state.require_profile());
        assert!(state.status.as_deref().unwrap().contains("job profile"));
        assert!(!state.view.get(1).unwrap().shortlisted);
    }

    #[test]
    fn test_late_ranking_after_close_is_dropped() {
        let mut state = AppState::new(true, 0.7);
        state.mode = Mode::Normal;
        state.status = Some("Loaded 3 candidate(s)".to_string());

        state.apply(Msg::Ranked(Ok(AiShortlistResult {
            total_candidates: 3,
            candidates: Vec::new(),
        })));

        assert!(state.ranking.is_none());
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(state.status.as_deref(), Some("Loaded 3 candidate(s)"));
    }

    #[test]
    fn test_reload_still_settles_pending_shortlist() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/company/candidates/1/shortlist");
            then.status(500)
                .delay(Duration::from_millis(300))
                .json_body(json!({"message": "database unavailable"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/company/candidates");
            then.status(503).json_body(json!({"message": "unavailable"}));
        });

        let store = Arc::new(MemorySessionStore::new());
        store.login("tok", UserType::Company, json!({"id": 1})).unwrap();
        let client = Arc::new(ApiClient::new(&server.base_url(), store, None).unwrap());

        let mut state = AppState::new(true, 0.7);
        state.apply(Msg::Loaded(Ok(vec![candidate(1, false)])));
        let mut workers = Workers::new();

        start_toggle(&mut state, &workers, &client, 1);
        assert!(state.view.get(1).unwrap().shortlisted);
        reload(&mut state, &mut workers, &client);

        let load = workers.reads.wait(Duration::from_secs(5)).unwrap();
        state.apply(load);
        let toggle = workers.writes.wait(Duration::from_secs(5)).unwrap();
        state.apply(toggle);

        assert!(!state.view.get(1).unwrap().shortlisted);
        assert!(state.status.as_deref().unwrap().contains("database unavailable"));
    }
}
