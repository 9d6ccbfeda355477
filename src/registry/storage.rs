use anyhow::{Context, Result};
use std::sync::Arc;

use super::types::RepositoryId;
use crate::error::ValidationError;
use crate::store::KeyValueStore;

/// Store key holding the JSON array of watched repositories
pub const REGISTRY_KEY: &str = "registry:repos";

/// Ordered set of watched repositories.
///
/// Read from the store once at construction and kept in memory afterwards.
/// Every mutation rewrites the whole list.
pub struct Registry {
    repos: Vec<RepositoryId>,
    store: Arc<dyn KeyValueStore>,
}

impl Registry {
    /// Load the registry from `store`. A missing key yields an empty registry.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let repos = match store.get(REGISTRY_KEY)? {
            Some(json) => serde_json::from_str::<Vec<RepositoryId>>(&json)
                .context("Failed to load watched repositories")?,
            None => Vec::new(),
        };

        log::debug!("Loaded {} watched repositories", repos.len());
        Ok(Self { repos, store })
    }

    /// Watched repositories in insertion order
    pub fn list(&self) -> &[RepositoryId] {
        &self.repos
    }

    pub fn contains(&self, id: &RepositoryId) -> bool {
        self.repos.contains(id)
    }

    /// Validate `input` and append it.
    ///
    /// Validation failures never touch the store. If persisting fails the
    /// in-memory list is left as it was.
    pub fn add(&mut self, input: &str) -> Result<RepositoryId> {
        let id = RepositoryId::parse(input)?;
        if self.contains(&id) {
            return Err(ValidationError::Duplicate(id.to_string()).into());
        }

        let mut next = self.repos.clone();
        next.push(id.clone());
        self.persist(&next)?;
        self.repos = next;

        log::debug!("Added {}", id);
        Ok(id)
    }

    /// Remove `id` if present. Returns whether anything was removed.
    ///
    /// The repository's cached snapshot is left behind; it is simply never
    /// read again.
    pub fn remove(&mut self, id: &RepositoryId) -> Result<bool> {
        if !self.contains(id) {
            return Ok(false);
        }

        let next: Vec<RepositoryId> = self.repos.iter().filter(|r| *r != id).cloned().collect();
        self.persist(&next)?;
        self.repos = next;

        log::debug!("Removed {}", id);
        Ok(true)
    }

    fn persist(&self, repos: &[RepositoryId]) -> Result<()> {
        let json = serde_json::to_string(repos).context("Failed to serialize repositories")?;
        self.store
            .set(REGISTRY_KEY, &json)
            .context("Failed to save watched repositories")
    }
}
