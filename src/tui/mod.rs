//! Interactive Finder over the cached snapshot
//!
//! Runs entirely against the already-loaded snapshot using ratatui and
//! crossterm. No network traffic happens while the Finder is open.

pub mod app;
pub mod widgets;

use anyhow::Result;
use app::App;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use crate::cache::Snapshot;
use crate::opener::UrlOpener;

/// Launch the Finder over a snapshot
pub fn run_finder(snapshot: &Snapshot, opener: Box<dyn UrlOpener>) -> Result<()> {
    let mut app = App::new(snapshot, opener);

    // Setup terminal (raw mode)
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main event loop
fn run_app<B>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B: ratatui::backend::Backend,
{
    loop {
        terminal.draw(|f| app.draw(f))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key)?;
            }
        }

        if app.should_exit() {
            break;
        }
    }

    Ok(())
}
