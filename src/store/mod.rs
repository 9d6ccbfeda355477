//! String-keyed persistence used by the registry and the snapshot cache.

mod disk;
mod memory;

pub use disk::{clear_cache, get_cache_path, DiskStore};
pub use memory::MemoryStore;

use anyhow::Result;

/// Opaque get/set store. No transactional guarantees: each `set` replaces the
/// whole value stored under `key`.
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}
