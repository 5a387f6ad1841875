//! Finder state machine
//!
//! One interactive session over one already-loaded snapshot. The session
//! switches between the repository and pull request collections, narrows them
//! with a live substring filter, and opens the selected item in the browser.
//! Nothing here mutates the snapshot; the Finder only derives view state.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

use super::widgets::{centered_rect, ColorScheme};
use crate::cache::Snapshot;
use crate::github::{PullRequest, Repository};
use crate::opener::UrlOpener;

const STATUS_TTL: Duration = Duration::from_secs(4);

/// Which collection the Finder is browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Repositories,
    PullRequests,
}

impl Mode {
    fn title(self) -> &'static str {
        match self {
            Mode::Repositories => "Repositories",
            Mode::PullRequests => "Pull Requests",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Mode::Repositories => Mode::PullRequests,
            Mode::PullRequests => Mode::Repositories,
        }
    }
}

/// View model over one snapshot record
#[derive(Debug, Clone)]
pub enum FindableItem {
    Repository(Repository),
    PullRequest(PullRequest),
}

impl FindableItem {
    pub fn title(&self) -> String {
        match self {
            FindableItem::Repository(repo) => format!("{}/{}", repo.owner.login, repo.name),
            FindableItem::PullRequest(pr) => {
                if pr.draft {
                    format!("{}: {} (draft)", pr.user.login, pr.title)
                } else {
                    format!("{}: {}", pr.user.login, pr.title)
                }
            }
        }
    }

    pub fn subtitle(&self) -> String {
        match self {
            FindableItem::Repository(repo) => repo.description.clone().unwrap_or_default(),
            FindableItem::PullRequest(pr) => format!("#{} {}", pr.number, pr.repository_name()),
        }
    }

    /// Text the live filter matches against
    pub fn filter_value(&self) -> &str {
        match self {
            FindableItem::Repository(repo) => &repo.name,
            FindableItem::PullRequest(pr) => &pr.title,
        }
    }

    /// Target for the open-in-browser action
    pub fn url(&self) -> &str {
        match self {
            FindableItem::Repository(repo) => &repo.web_url,
            FindableItem::PullRequest(pr) => &pr.web_url,
        }
    }
}

/// Finder session state
pub struct App {
    repositories: Vec<FindableItem>,
    pull_requests: Vec<FindableItem>,

    mode: Mode,
    filter: String,
    /// True while keystrokes edit the filter instead of triggering actions
    filtering: bool,
    /// Indices into the active collection that survive the filter
    visible: Vec<usize>,
    selected: usize,
    list_state: ListState,

    status: Option<(String, Instant)>,
    show_help: bool,
    should_exit: bool,

    opener: Box<dyn UrlOpener>,
    colors: ColorScheme,
}

impl App {
    pub fn new(snapshot: &Snapshot, opener: Box<dyn UrlOpener>) -> Self {
        let repositories = snapshot
            .repositories
            .iter()
            .cloned()
            .map(FindableItem::Repository)
            .collect();
        let pull_requests = snapshot
            .pull_requests
            .iter()
            .cloned()
            .map(FindableItem::PullRequest)
            .collect();

        let mut app = Self {
            repositories,
            pull_requests,
            mode: Mode::Repositories,
            filter: String::new(),
            filtering: false,
            visible: Vec::new(),
            selected: 0,
            list_state: ListState::default(),
            status: None,
            show_help: false,
            should_exit: false,
            opener,
            colors: ColorScheme::default(),
        };
        app.apply_filter();
        app
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn status_message(&self) -> Option<&str> {
        match &self.status {
            Some((message, set_at)) if set_at.elapsed() < STATUS_TTL => Some(message),
            _ => None,
        }
    }

    fn active(&self) -> &[FindableItem] {
        match self.mode {
            Mode::Repositories => &self.repositories,
            Mode::PullRequests => &self.pull_requests,
        }
    }

    fn selected_item(&self) -> Option<&FindableItem> {
        self.visible
            .get(self.selected)
            .map(|&index| &self.active()[index])
    }

    /// Recompute the visible list and clamp the selection into it
    fn apply_filter(&mut self) {
        let needle = self.filter.to_lowercase();

        self.visible = self
            .active()
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                needle.is_empty() || item.filter_value().to_lowercase().contains(&needle)
            })
            .map(|(index, _)| index)
            .collect();

        if self.visible.is_empty() {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(self.visible.len() - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    /// Handle one keyboard event
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return Ok(());
        }

        if self.show_help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')
            ) {
                self.show_help = false;
            }
            return Ok(());
        }

        if self.filtering {
            match key.code {
                KeyCode::Esc => {
                    self.filtering = false;
                    self.filter.clear();
                    self.apply_filter();
                }
                KeyCode::Enter => {
                    self.filtering = false;
                }
                KeyCode::Backspace => {
                    self.filter.pop();
                    self.apply_filter();
                }
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    self.apply_filter();
                }
                KeyCode::Up => self.select_previous(),
                KeyCode::Down => self.select_next(),
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_exit = true;
            }
            KeyCode::Esc => {
                if self.filter.is_empty() {
                    self.should_exit = true;
                } else {
                    self.filter.clear();
                    self.apply_filter();
                }
            }
            KeyCode::Char('/') => {
                self.filtering = true;
            }
            KeyCode::Char('r') => {
                self.toggle_mode();
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            KeyCode::Char('o') => {
                self.open_selected();
            }
            KeyCode::Enter => {
                self.choose_selected();
            }
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            _ => {}
        }

        Ok(())
    }

    /// Swap collections, dropping the filter and selection
    fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.filter.clear();
        self.filtering = false;
        self.selected = 0;
        self.apply_filter();
    }

    fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.list_state.select(Some(self.selected));
        }
    }

    fn select_next(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
            self.list_state.select(Some(self.selected));
        }
    }

    fn open_selected(&mut self) {
        let (title, url) = match self.selected_item() {
            Some(item) => (item.title(), item.url().to_string()),
            None => return,
        };

        match self.opener.open(&url) {
            Ok(()) => self.set_status(format!("Opened {}", title)),
            Err(e) => self.set_status(format!("Failed to open {}: {}", title, e)),
        }
    }

    fn choose_selected(&mut self) {
        if let Some(item) = self.selected_item() {
            let message = format!("You chose {}", item.title());
            self.set_status(message);
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now()));
    }

    /// Draw the Finder UI
    pub fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        self.draw_list(frame, chunks[0]);
        self.draw_footer(frame, chunks[1]);

        if self.show_help {
            self.draw_help_popup(frame, size);
        }
    }

    fn draw_list(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .visible
            .iter()
            .map(|&index| {
                let item = &self.active()[index];
                ListItem::new(vec![
                    Line::from(Span::styled(
                        item.title(),
                        Style::default().fg(self.colors.text),
                    )),
                    Line::from(Span::styled(
                        format!("  {}", item.subtitle()),
                        Style::default().fg(self.colors.muted),
                    )),
                ])
            })
            .collect();

        let title = format!(
            "{} ({}/{})",
            self.mode.title(),
            self.visible.len(),
            self.active().len()
        );

        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.colors.border)),
            )
            .highlight_style(
                Style::default()
                    .bg(self.colors.primary)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let (text, color) = if self.filtering {
            (format!(" /{}▌", self.filter), self.colors.primary)
        } else if let Some(message) = self.status_message() {
            (format!(" {}", message), self.colors.secondary)
        } else if !self.filter.is_empty() {
            (format!(" filter: {}", self.filter), self.colors.secondary)
        } else {
            (
                " q quit · / filter · r toggle · o open · ? help".to_string(),
                self.colors.muted,
            )
        };

        let paragraph = Paragraph::new(text).style(Style::default().fg(color));
        frame.render_widget(paragraph, area);
    }

    fn draw_help_popup(&self, frame: &mut Frame, area: Rect) {
        let help_text = r#"Keybindings:
  q / Ctrl+C   Quit
  /            Filter the list (Enter accepts, Esc clears)
  Esc          Clear filter, or quit when empty
  r            Toggle repositories / pull requests
  j/↓  k/↑     Move selection
  o            Open selected item in browser
  Enter        Choose selected item
  ?            Toggle this help
"#;

        let popup_area = centered_rect(50, 60, area);
        frame.render_widget(Clear, popup_area);

        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .title("Help (press ? to close)")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.colors.primary)),
            )
            .style(Style::default().fg(self.colors.text));

        frame.render_widget(paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Owner;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    struct RecordingOpener {
        opened: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("no browser available");
            }
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            full_name: format!("acme/{}", name),
            owner: Owner {
                login: "acme".to_string(),
            },
            clone_url: format!("https://github.com/acme/{}.git", name),
            web_url: format!("https://github.com/acme/{}", name),
            description: Some(format!("the {} project", name)),
        }
    }

    fn pr(number: u64, title: &str) -> PullRequest {
        PullRequest {
            number,
            title: title.to_string(),
            user: Owner {
                login: "alice".to_string(),
            },
            web_url: format!("https://github.com/acme/alpha/pull/{}", number),
            draft: false,
            repository_url: "https://api.github.com/repos/acme/alpha".to_string(),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            timestamp: Utc::now(),
            repositories: vec![repo("alpha"), repo("beta"), repo("alphabeta")],
            pull_requests: vec![pr(1, "Add parser"), pr(2, "Fix cache")],
        }
    }

    fn new_app() -> (App, Arc<Mutex<Vec<String>>>) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let opener = RecordingOpener {
            opened: opened.clone(),
            fail: false,
        };
        (App::new(&snapshot(), Box::new(opener)), opened)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_filter(app: &mut App, text: &str) {
        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        app.handle_key(key(KeyCode::Enter)).unwrap();
    }

    fn visible_filter_values(app: &App) -> Vec<String> {
        (0..app.visible_len())
            .map(|i| app.active()[app.visible[i]].filter_value().to_string())
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let (app, _) = new_app();

        assert_eq!(app.mode(), Mode::Repositories);
        assert_eq!(app.filter(), "");
        assert_eq!(app.selected_index(), 0);
        assert_eq!(app.visible_len(), 3);
    }

    #[test]
    fn test_filter_narrowing_preserves_order() {
        let (mut app, _) = new_app();

        type_filter(&mut app, "alpha");

        assert_eq!(visible_filter_values(&app), vec!["alpha", "alphabeta"]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let (mut app, _) = new_app();

        type_filter(&mut app, "ALPHA");

        assert_eq!(app.visible_len(), 2);
    }

    #[test]
    fn test_filter_narrows_live_per_keystroke() {
        let (mut app, _) = new_app();

        app.handle_key(key(KeyCode::Char('/'))).unwrap();
        app.handle_key(key(KeyCode::Char('b'))).unwrap();
        assert_eq!(visible_filter_values(&app), vec!["beta", "alphabeta"]);

        app.handle_key(key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.visible_len(), 3);
    }

    #[test]
    fn test_mode_toggle_resets_filter_and_selection() {
        let (mut app, _) = new_app();

        type_filter(&mut app, "alpha");
        app.handle_key(key(KeyCode::Down)).unwrap();
        assert_eq!(app.selected_index(), 1);

        app.handle_key(key(KeyCode::Char('r'))).unwrap();

        assert_eq!(app.mode(), Mode::PullRequests);
        assert_eq!(app.filter(), "");
        assert_eq!(app.selected_index(), 0);
        assert_eq!(app.visible_len(), 2); // full pull request collection
    }

    #[test]
    fn test_selection_clamped_on_filter_change() {
        let (mut app, _) = new_app();

        app.handle_key(key(KeyCode::Down)).unwrap();
        app.handle_key(key(KeyCode::Down)).unwrap();
        assert_eq!(app.selected_index(), 2);

        type_filter(&mut app, "alpha");

        assert_eq!(app.visible_len(), 2);
        assert_eq!(app.selected_index(), 1);
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let (mut app, _) = new_app();

        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down)).unwrap();
        }
        assert_eq!(app.selected_index(), 2);

        for _ in 0..10 {
            app.handle_key(key(KeyCode::Up)).unwrap();
        }
        assert_eq!(app.selected_index(), 0);
    }

    #[test]
    fn test_open_dispatches_repository_url() {
        let (mut app, opened) = new_app();

        app.handle_key(key(KeyCode::Down)).unwrap();
        app.handle_key(key(KeyCode::Char('o'))).unwrap();

        assert_eq!(
            opened.lock().unwrap().as_slice(),
            ["https://github.com/acme/beta"]
        );
        assert!(app.status_message().unwrap().contains("Opened"));
    }

    #[test]
    fn test_open_dispatches_pull_request_url() {
        let (mut app, opened) = new_app();

        app.handle_key(key(KeyCode::Char('r'))).unwrap();
        app.handle_key(key(KeyCode::Char('o'))).unwrap();

        assert_eq!(
            opened.lock().unwrap().as_slice(),
            ["https://github.com/acme/alpha/pull/1"]
        );
    }

    #[test]
    fn test_open_failure_is_not_fatal() {
        let opener = RecordingOpener {
            opened: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        };
        let mut app = App::new(&snapshot(), Box::new(opener));

        app.handle_key(key(KeyCode::Char('o'))).unwrap();

        assert!(!app.should_exit());
        assert!(app.status_message().unwrap().contains("Failed to open"));
    }

    #[test]
    fn test_choose_is_cosmetic() {
        let (mut app, opened) = new_app();

        app.handle_key(key(KeyCode::Enter)).unwrap();

        assert!(!app.should_exit());
        assert!(opened.lock().unwrap().is_empty());
        assert_eq!(app.status_message(), Some("You chose acme/alpha"));
    }

    #[test]
    fn test_help_does_not_touch_mode_or_filter() {
        let (mut app, _) = new_app();

        type_filter(&mut app, "alpha");
        app.handle_key(key(KeyCode::Char('?'))).unwrap();
        // Keys other than the dismiss keys are swallowed by the popup
        app.handle_key(key(KeyCode::Char('r'))).unwrap();
        app.handle_key(key(KeyCode::Char('?'))).unwrap();

        assert_eq!(app.mode(), Mode::Repositories);
        assert_eq!(app.filter(), "alpha");
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _) = new_app();
        app.handle_key(key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_exit());

        let (mut app, _) = new_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(app.should_exit());
    }

    #[test]
    fn test_esc_clears_filter_before_quitting() {
        let (mut app, _) = new_app();

        type_filter(&mut app, "alpha");
        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(!app.should_exit());
        assert_eq!(app.filter(), "");
        assert_eq!(app.visible_len(), 3);

        app.handle_key(key(KeyCode::Esc)).unwrap();
        assert!(app.should_exit());
    }

    #[test]
    fn test_empty_visible_list_disables_selection() {
        let (mut app, opened) = new_app();

        type_filter(&mut app, "zzz");
        assert_eq!(app.visible_len(), 0);

        // Open on an empty list is a no-op
        app.handle_key(key(KeyCode::Char('o'))).unwrap();
        assert!(opened.lock().unwrap().is_empty());
    }
}
