use crate::delta::{Fetcher, RepoSnapshot};
use crate::error::FetchError;
use crate::fetch::RepoResult;
use crate::registry::{Registry, RepositoryId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Auto-refresh is held back this long after the last key press
const IDLE_BEFORE_AUTO_REFRESH: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    AddInput,
    ConfirmRemove,
    Help,
}

/// What a card currently shows
#[derive(Debug, Clone)]
pub enum CardState {
    Loading,
    Ready(RepoSnapshot),
    Failed(FetchError),
}

#[derive(Debug, Clone)]
pub struct Card {
    pub repo: RepositoryId,
    pub state: CardState,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Card {
    fn new(repo: RepositoryId) -> Self {
        Self {
            repo,
            state: CardState::Loading,
            fetched_at: None,
        }
    }

    pub fn snapshot(&self) -> Option<&RepoSnapshot> {
        match &self.state {
            CardState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Opaque reference to a card on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardHandle(usize);

pub struct App {
    pub registry: Registry,
    pub fetcher: Arc<Fetcher>,
    pub cards: Vec<Card>,
    handles: HashMap<RepositoryId, CardHandle>,
    pub table_state: ratatui::widgets::TableState,
    pub input_mode: InputMode,
    pub add_input: String,
    pub flash_message: Option<(String, Instant)>,
    pub last_refresh: Instant,
    pub last_interaction: Instant,
    /// Repositories waiting for a fetch to be spawned
    pub pending_fetches: Vec<RepositoryId>,
    pub needs_refresh: bool,
    pub force_refresh: bool,
    pub should_quit: bool,
    pub is_loading: bool,
    /// Set once the first refresh round has finished, whatever its outcome
    pub initial_load_done: bool,
    /// PR list pane takes the space of the repository table
    pub prs_expanded: bool,
    pub spinner_frame: usize,
    pub auto_refresh_interval: Duration,
}

impl App {
    /// Create an app with one loading card per watched repository
    pub fn new(registry: Registry, fetcher: Arc<Fetcher>, auto_refresh_interval: Duration) -> Self {
        let mut app = Self {
            registry,
            fetcher,
            cards: Vec::new(),
            handles: HashMap::new(),
            table_state: ratatui::widgets::TableState::default(),
            input_mode: InputMode::Normal,
            add_input: String::new(),
            flash_message: None,
            last_refresh: Instant::now(),
            last_interaction: Instant::now(),
            pending_fetches: Vec::new(),
            needs_refresh: true,
            force_refresh: false,
            should_quit: false,
            is_loading: false,
            initial_load_done: false,
            prs_expanded: false,
            spinner_frame: 0,
            auto_refresh_interval,
        };
        app.rebuild_cards();
        app
    }

    /// Sync cards with the registry, keeping state for repositories that
    /// are still watched.
    fn rebuild_cards(&mut self) {
        let mut old: HashMap<RepositoryId, Card> = self
            .cards
            .drain(..)
            .map(|card| (card.repo.clone(), card))
            .collect();

        self.cards = self
            .registry
            .list()
            .iter()
            .map(|repo| old.remove(repo).unwrap_or_else(|| Card::new(repo.clone())))
            .collect();

        self.handles = self
            .cards
            .iter()
            .enumerate()
            .map(|(idx, card)| (card.repo.clone(), CardHandle(idx)))
            .collect();

        if self.cards.is_empty() {
            self.table_state.select(None);
        } else {
            let selected = self.table_state.selected().unwrap_or(0);
            self.table_state.select(Some(selected.min(self.cards.len() - 1)));
        }
    }

    pub fn handle_for(&self, repo: &RepositoryId) -> Option<CardHandle> {
        self.handles.get(repo).copied()
    }

    fn card_mut(&mut self, handle: CardHandle) -> Option<&mut Card> {
        self.cards.get_mut(handle.0)
    }

    pub fn next_row(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i >= self.cards.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.cards.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_card(&self) -> Option<&Card> {
        self.table_state.selected().and_then(|i| self.cards.get(i))
    }

    pub fn update_flash(&mut self) {
        if let Some((_, timestamp)) = self.flash_message {
            if timestamp.elapsed().as_secs() >= 3 {
                self.flash_message = None;
            }
        }
    }

    pub fn show_flash(&mut self, msg: String) {
        self.flash_message = Some((msg, Instant::now()));
    }

    /// Open the selected repository's search page in the browser
    pub fn open_selected(&self) -> anyhow::Result<()> {
        if let Some(card) = self.selected_card() {
            let url = crate::browser::target_url(&card.repo, card.snapshot());
            crate::browser::open_url(&url)?;
        }
        Ok(())
    }

    pub fn start_add_input(&mut self) {
        self.input_mode = InputMode::AddInput;
        self.add_input.clear();
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.add_input.clear();
    }

    /// Validate and register the typed repository, then queue its fetch.
    pub fn confirm_add_input(&mut self) {
        let input = std::mem::take(&mut self.add_input);
        self.input_mode = InputMode::Normal;

        match self.registry.add(&input) {
            Ok(repo) => {
                self.rebuild_cards();
                if let Some(handle) = self.handle_for(&repo) {
                    self.table_state.select(Some(handle.0));
                }
                self.pending_fetches.push(repo.clone());
                self.show_flash(format!("Added: {}", repo));
            }
            Err(e) => self.show_flash(format!("Error: {}", e)),
        }
    }

    pub fn start_remove(&mut self) {
        if self.selected_card().is_some() {
            self.input_mode = InputMode::ConfirmRemove;
        }
    }

    /// Remove the selected repository. Its cached snapshot stays in the
    /// store, unused.
    pub fn confirm_remove(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(repo) = self.selected_card().map(|c| c.repo.clone()) else {
            return;
        };

        match self.registry.remove(&repo) {
            Ok(_) => {
                self.rebuild_cards();
                self.show_flash(format!("Removed: {}", repo));
            }
            Err(e) => self.show_flash(format!("Failed to remove {}: {:#}", repo, e)),
        }
    }

    pub fn request_refresh(&mut self) {
        self.needs_refresh = true;
        self.force_refresh = true;
        self.show_flash("Refreshing (fresh data)...".to_string());
    }

    /// Repositories a refresh round should cover. Forced rounds put every
    /// card back into the loading state.
    pub fn begin_refresh(&mut self, force: bool) -> Vec<RepositoryId> {
        if force {
            for card in &mut self.cards {
                card.state = CardState::Loading;
            }
        }
        self.is_loading = true;
        self.cards.iter().map(|c| c.repo.clone()).collect()
    }

    /// Apply finished fetches. Results for repositories removed meanwhile
    /// are dropped.
    pub fn apply_results(&mut self, results: Vec<RepoResult>) {
        for (repo, result) in results {
            let Some(handle) = self.handle_for(&repo) else {
                continue;
            };
            let fetched_at = self
                .fetcher
                .cached_entry(&repo)
                .and_then(|entry| entry.fetched_at());
            if let Some(card) = self.card_mut(handle) {
                match result {
                    Ok(snapshot) => {
                        card.state = CardState::Ready(snapshot);
                        card.fetched_at = fetched_at;
                    }
                    Err(e) => card.state = CardState::Failed(e),
                }
            }
        }
    }

    /// Mark the cards of `repos` that are still loading as failed with
    /// `message`. Cards covered by other fetches are left alone.
    pub fn fail_loading(&mut self, repos: &[RepositoryId], message: &str) {
        for repo in repos {
            let Some(handle) = self.handle_for(repo) else {
                continue;
            };
            if let Some(card) = self.card_mut(handle) {
                if matches!(card.state, CardState::Loading) {
                    card.state = CardState::Failed(FetchError::from_service(message, None));
                }
            }
        }
    }

    /// Whether a pending refresh may start now. Manual refreshes and the
    /// first load start at once; auto-refresh waits for the user to be idle
    /// with no popup open.
    pub fn refresh_allowed(&self) -> bool {
        let modal_open = self.input_mode != InputMode::Normal;
        let recent_interaction = self.last_interaction.elapsed() < IDLE_BEFORE_AUTO_REFRESH;
        self.force_refresh || !self.initial_load_done || (!modal_open && !recent_interaction)
    }

    pub fn finish_refresh(&mut self) {
        self.is_loading = false;
        self.initial_load_done = true;
        self.last_refresh = Instant::now();

        let failed = self
            .cards
            .iter()
            .filter(|c| matches!(c.state, CardState::Failed(_)))
            .count();
        let rate_limited = self
            .cards
            .iter()
            .filter(|c| matches!(&c.state, CardState::Failed(e) if e.is_rate_limited()))
            .count();

        if rate_limited > 0 {
            self.show_flash("Error: Rate limit exceeded (60/hr). Try again later.".to_string());
        } else if failed > 0 {
            self.show_flash(format!("Refreshed ({} failed)", failed));
        } else {
            self.show_flash(format!("Refreshed ({} repositories)", self.cards.len()));
        }
    }

    /// Advance the loading spinner animation frame
    pub fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    pub fn toggle_prs(&mut self) {
        self.prs_expanded = !self.prs_expanded;
    }

    pub fn show_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn dismiss_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::{ReleaseInfo, SearchPage};
    use crate::github::ReleaseSource;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct NoReleases;

    #[async_trait]
    impl ReleaseSource for NoReleases {
        async fn latest_release(
            &self,
            _repo: &RepositoryId,
        ) -> Result<Option<ReleaseInfo>, FetchError> {
            Ok(None)
        }

        async fn closed_unmerged_since(
            &self,
            _repo: &RepositoryId,
            _since: DateTime<Utc>,
        ) -> Result<SearchPage, FetchError> {
            Ok(SearchPage::default())
        }
    }

    fn app_with(repos: &[&str]) -> App {
        let store = Arc::new(MemoryStore::new());
        let mut registry = Registry::load(store.clone()).unwrap();
        for repo in repos {
            registry.add(repo).unwrap();
        }
        let fetcher = Arc::new(Fetcher::new(Arc::new(NoReleases), store));
        App::new(registry, fetcher, Duration::from_secs(900))
    }

    fn repo(s: &str) -> RepositoryId {
        RepositoryId::parse(s).unwrap()
    }

    #[test]
    fn test_new_app_has_loading_cards() {
        let app = app_with(&["a/one", "b/two"]);
        assert_eq!(app.cards.len(), 2);
        assert!(matches!(app.cards[0].state, CardState::Loading));
        assert_eq!(app.table_state.selected(), Some(0));
        assert_eq!(app.handle_for(&repo("b/two")), Some(CardHandle(1)));
    }

    #[test]
    fn test_add_queues_fetch_and_selects() {
        let mut app = app_with(&["a/one"]);
        app.start_add_input();
        app.add_input = "c/three".to_string();
        app.confirm_add_input();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.cards.len(), 2);
        assert_eq!(app.pending_fetches, vec![repo("c/three")]);
        assert_eq!(app.table_state.selected(), Some(1));
    }

    #[test]
    fn test_add_invalid_shows_error() {
        let mut app = app_with(&[]);
        app.add_input = "nope".to_string();
        app.confirm_add_input();

        assert!(app.cards.is_empty());
        assert!(app.pending_fetches.is_empty());
        let (msg, _) = app.flash_message.clone().unwrap();
        assert!(msg.starts_with("Error:"));
    }

    #[test]
    fn test_remove_keeps_other_card_state() {
        let mut app = app_with(&["a/one", "b/two"]);
        app.apply_results(vec![(repo("b/two"), Ok(RepoSnapshot::no_release()))]);

        app.table_state.select(Some(0));
        app.start_remove();
        app.confirm_remove();

        assert_eq!(app.cards.len(), 1);
        assert_eq!(app.cards[0].repo, repo("b/two"));
        assert!(matches!(app.cards[0].state, CardState::Ready(_)));
        assert_eq!(app.handle_for(&repo("a/one")), None);
    }

    #[test]
    fn test_results_for_removed_repo_are_dropped() {
        let mut app = app_with(&["a/one"]);
        app.apply_results(vec![(repo("gone/away"), Ok(RepoSnapshot::no_release()))]);
        assert_eq!(app.cards.len(), 1);
        assert!(matches!(app.cards[0].state, CardState::Loading));
    }

    #[test]
    fn test_failures_and_timeouts() {
        let mut app = app_with(&["a/one", "b/two"]);
        let repos = app.begin_refresh(true);
        app.apply_results(vec![(
            repo("a/one"),
            Err(FetchError::from_service("rate limit", Some(403))),
        )]);
        app.fail_loading(&repos, "Refresh timed out (20s)");
        app.finish_refresh();

        assert!(matches!(&app.cards[0].state, CardState::Failed(e) if e.is_rate_limited()));
        assert!(matches!(&app.cards[1].state, CardState::Failed(e) if !e.is_rate_limited()));
        assert!(!app.is_loading);
        let (msg, _) = app.flash_message.clone().unwrap();
        assert!(msg.contains("Rate limit"));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app_with(&["a/one", "b/two"]);
        app.previous_row();
        assert_eq!(app.table_state.selected(), Some(1));
        app.next_row();
        assert_eq!(app.table_state.selected(), Some(0));
    }

    #[test]
    fn test_toggle_prs() {
        let mut app = app_with(&["a/one"]);
        assert!(!app.prs_expanded);
        app.toggle_prs();
        assert!(app.prs_expanded);
        app.toggle_prs();
        assert!(!app.prs_expanded);
    }

    #[test]
    fn test_timeout_only_fails_its_own_repos() {
        let mut app = app_with(&["a/one", "b/two"]);
        app.begin_refresh(true);

        app.fail_loading(&[repo("b/two"), repo("gone/away")], "Fetch timed out (20s)");

        assert!(matches!(app.cards[0].state, CardState::Loading));
        assert!(matches!(&app.cards[1].state, CardState::Failed(e) if e.to_string() == "Fetch timed out (20s)"));
    }

    #[test]
    fn test_auto_refresh_gated_after_failed_first_load() {
        let mut app = app_with(&["a/one"]);
        app.input_mode = InputMode::Help;
        assert!(app.refresh_allowed());

        let repos = app.begin_refresh(false);
        app.fail_loading(&repos, "Refresh timed out (20s)");
        app.finish_refresh();
        assert!(app.initial_load_done);
        assert!(app.cards.iter().all(|c| c.fetched_at.is_none()));

        // Nothing ever loaded, but the popup still holds auto-refresh back
        assert!(!app.refresh_allowed());

        app.force_refresh = true;
        assert!(app.refresh_allowed());
    }
}
