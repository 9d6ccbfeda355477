use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::snapshot::{snapshot_key, CacheEntry, RepoSnapshot};
use crate::error::FetchError;
use crate::github::ReleaseSource;
use crate::registry::RepositoryId;
use crate::store::KeyValueStore;

/// Cached snapshots older than this are refetched (1 hour)
pub const FRESHNESS_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Per-repository serialization point.
///
/// `completed` counts successful fetches. A caller that sees it change while
/// waiting for `lock` knows a fetch finished in the meantime and can take
/// `latest` instead of going back to the network. `latest` holds what the
/// last fetch returned, whether or not its cache write succeeded.
#[derive(Default)]
struct FetchSlot {
    lock: tokio::sync::Mutex<()>,
    completed: AtomicU64,
    latest: Mutex<Option<RepoSnapshot>>,
}

impl FetchSlot {
    fn record(&self, snapshot: &RepoSnapshot) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot.clone());
        self.completed.fetch_add(1, Ordering::Release);
    }

    fn latest(&self) -> Option<RepoSnapshot> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Produces a `RepoSnapshot` per repository, keeping results in the store for
/// an hour so repeated refreshes stay within the anonymous rate limit.
pub struct Fetcher {
    source: Arc<dyn ReleaseSource>,
    store: Arc<dyn KeyValueStore>,
    slots: Mutex<HashMap<RepositoryId, Arc<FetchSlot>>>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn ReleaseSource>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            source,
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot for `repo`.
    ///
    /// Without `force`, a cache entry younger than the freshness window is
    /// returned with no network access. Otherwise the release and the search
    /// are fetched; only a complete result is cached, and any failure leaves
    /// the previous entry untouched.
    ///
    /// Fetches for the same repository never overlap. A forced fetch that had
    /// to wait for one already in flight returns that fetch's result instead
    /// of issuing its own requests.
    pub async fn fetch(&self, repo: &RepositoryId, force: bool) -> Result<RepoSnapshot, FetchError> {
        let slot = self.slot_for(repo);
        let seen = slot.completed.load(Ordering::Acquire);
        let _guard = slot.lock.lock().await;

        if force {
            if slot.completed.load(Ordering::Acquire) != seen {
                if let Some(snapshot) = slot.latest() {
                    log::debug!("Joined in-flight refresh for {}", repo);
                    return Ok(snapshot);
                }
            }
            log::debug!("Force refreshing {}", repo);
        } else if let Some(entry) = self.cached_entry(repo) {
            if entry.is_fresh(Utc::now(), FRESHNESS_WINDOW_MS) {
                log::debug!("Using cached data for {}", repo);
                return Ok(entry.snapshot);
            }
        }

        let snapshot = self.fetch_remote(repo).await?;
        self.save_entry(repo, &snapshot);
        slot.record(&snapshot);
        Ok(snapshot)
    }

    /// Cached entry for `repo` regardless of age. Unreadable entries count as
    /// missing.
    pub fn cached_entry(&self, repo: &RepositoryId) -> Option<CacheEntry> {
        let key = snapshot_key(repo);
        let json = match self.store.get(&key) {
            Ok(json) => json?,
            Err(e) => {
                log::warn!("Cache read error for {}: {:#}", repo, e);
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Cache parse error for {}: {}", repo, e);
                None
            }
        }
    }

    async fn fetch_remote(&self, repo: &RepositoryId) -> Result<RepoSnapshot, FetchError> {
        let Some(release) = self.source.latest_release(repo).await? else {
            return Ok(RepoSnapshot::no_release());
        };

        let page = self
            .source
            .closed_unmerged_since(repo, release.published_at)
            .await?;
        log::debug!(
            "{}: {} closed unmerged since {} ({} on first page)",
            repo,
            page.total_count,
            release.tag_name,
            page.items.len()
        );

        Ok(RepoSnapshot::from_search(release, page))
    }

    /// Cache write failures are logged, not returned: the caller still gets
    /// the data it asked for.
    fn save_entry(&self, repo: &RepositoryId, snapshot: &RepoSnapshot) {
        let entry = CacheEntry::new(Utc::now(), snapshot.clone());
        let result = serde_json::to_string(&entry)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(&snapshot_key(repo), &json));
        if let Err(e) = result {
            log::warn!("Failed to cache snapshot for {}: {:#}", repo, e);
        }
    }

    fn slot_for(&self, repo: &RepositoryId) -> Arc<FetchSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(repo.clone()).or_default().clone()
    }
}
