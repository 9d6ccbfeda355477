pub mod app;
pub mod event;
pub mod theme;
pub mod ui;

pub use app::App;

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use event::{Event, EventHandler};
use tokio::task::JoinHandle;

use crate::fetch::{fetch_all, RepoResult};
use crate::registry::RepositoryId;

/// Upper bound for one refresh round
const REFRESH_TIMEOUT: Duration = Duration::from_secs(20);

/// A spawned fetch and the repositories it covers
struct FetchTask {
    repos: Vec<RepositoryId>,
    handle: JoinHandle<Result<Vec<RepoResult>, tokio::time::error::Elapsed>>,
}

impl FetchTask {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn spawn_fetch(app: &App, repos: Vec<RepositoryId>, force: bool) -> FetchTask {
    let fetcher = app.fetcher.clone();
    let covered = repos.clone();
    let handle = tokio::spawn(async move {
        tokio::time::timeout(REFRESH_TIMEOUT, fetch_all(&fetcher, &repos, force)).await
    });
    FetchTask {
        repos: covered,
        handle,
    }
}

pub async fn run_tui(mut app: App) -> anyhow::Result<()> {
    // Buffer log output while the TUI owns the terminal
    crate::stderr_buffer::activate();

    // Init terminal (sets up panic hooks automatically)
    let mut terminal = ratatui::init();
    let mut events = EventHandler::new(Duration::from_millis(250), app.auto_refresh_interval);

    // Full refresh rounds: at most one at a time
    let mut pending_refresh: Option<FetchTask> = None;
    // Single-repository fetches for newly added repositories
    let mut pending_adds: Vec<FetchTask> = Vec::new();

    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::draw(frame, &mut app)) {
            break Err(e.into());
        }

        match events.next().await {
            Event::Key(key) => {
                app.last_interaction = std::time::Instant::now();
                handle_key_event(&mut app, key);
            }
            Event::Tick => {
                app.update_flash();
                app.advance_spinner();
            }
            Event::Refresh => {
                app.needs_refresh = true;
            }
        }

        // Check if the refresh round has completed
        if pending_refresh.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = pending_refresh.take() {
                match task.handle.await {
                    Ok(Ok(results)) => app.apply_results(results),
                    Ok(Err(_elapsed)) => app.fail_loading(&task.repos, "Refresh timed out (20s)"),
                    Err(e) => {
                        app.fail_loading(&task.repos, &format!("Refresh task panicked: {}", e))
                    }
                }
                app.finish_refresh();
            }
        }

        // Collect finished single-repository fetches
        let (finished, running): (Vec<_>, Vec<_>) =
            pending_adds.drain(..).partition(|t| t.is_finished());
        pending_adds = running;
        for task in finished {
            match task.handle.await {
                Ok(Ok(results)) => app.apply_results(results),
                Ok(Err(_elapsed)) => app.fail_loading(&task.repos, "Fetch timed out (20s)"),
                Err(e) => app.show_flash(format!("Fetch task panicked: {}", e)),
            }
        }

        // Spawn fetches for newly added repositories
        if !app.pending_fetches.is_empty() {
            let repos = std::mem::take(&mut app.pending_fetches);
            pending_adds.push(spawn_fetch(&app, repos, false));
        }

        // Spawn a refresh round if needed and none is pending
        if app.needs_refresh && pending_refresh.is_none() && app.refresh_allowed() {
            let is_manual = app.force_refresh;
            app.needs_refresh = false;
            app.force_refresh = false;

            let repos = app.begin_refresh(is_manual);
            pending_refresh = Some(spawn_fetch(&app, repos, is_manual));
        }

        if app.should_quit {
            break Ok(());
        }
    };

    // Restore terminal
    ratatui::restore();

    // Flush buffered log output now that the terminal is restored
    for msg in crate::stderr_buffer::drain() {
        eprintln!("{}", msg);
    }

    result
}

fn handle_key_event(app: &mut App, key: KeyEvent) {
    match app.input_mode {
        app::InputMode::Normal => match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.should_quit = true
            }

            KeyCode::Char('j') | KeyCode::Down => app.next_row(),
            KeyCode::Char('k') | KeyCode::Up => app.previous_row(),

            KeyCode::Enter => app.toggle_prs(),
            KeyCode::Char('o') => {
                if let Some(repo) = app.selected_card().map(|c| c.repo.to_string()) {
                    match app.open_selected() {
                        Ok(()) => app.show_flash(format!("Opened: {}", repo)),
                        Err(e) => app.show_flash(format!("Failed to open browser: {}", e)),
                    }
                }
            }

            KeyCode::Char('a') => app.start_add_input(),
            KeyCode::Char('d') => app.start_remove(),
            KeyCode::Char('r') => app.request_refresh(),
            KeyCode::Char('?') => app.show_help(),
            _ => {}
        },
        app::InputMode::AddInput => match key.code {
            KeyCode::Enter => app.confirm_add_input(),
            KeyCode::Esc => app.cancel_input(),
            KeyCode::Backspace => {
                app.add_input.pop();
            }
            // Repository names: alphanumerics plus - _ . /
            KeyCode::Char(c) if c.is_alphanumeric() || "-_./".contains(c) => {
                app.add_input.push(c);
            }
            _ => {}
        },
        app::InputMode::ConfirmRemove => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => app.confirm_remove(),
            _ => app.cancel_input(),
        },
        app::InputMode::Help => app.dismiss_help(),
    }
}
