use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::KeyValueStore;

/// Get the platform-appropriate cache directory for relwatch
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("relwatch/store"))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/.cache/relwatch/store",
                std::env::var("HOME").unwrap_or_default()
            ))
        })
}

/// Remove the whole store directory. The registry lives there too, so this
/// forgets watched repositories as well as cached snapshots.
pub fn clear_cache(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

/// Disk-persistent store backed by cacache.
#[derive(Debug, Clone)]
pub struct DiskStore {
    cache_path: PathBuf,
}

impl DiskStore {
    pub fn new(cache_path: PathBuf) -> Self {
        Self { cache_path }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        // A missing index entry is the normal "nothing stored" case
        let Some(_) = cacache::metadata_sync(&self.cache_path, key)
            .with_context(|| format!("Failed to read cache index for '{}'", key))?
        else {
            return Ok(None);
        };

        let bytes = cacache::read_sync(&self.cache_path, key)
            .with_context(|| format!("Failed to read cache entry '{}'", key))?;
        let value = String::from_utf8(bytes)
            .with_context(|| format!("Cache entry '{}' is not valid UTF-8", key))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        cacache::write_sync(&self.cache_path, key, value.as_bytes())
            .with_context(|| format!("Failed to write cache entry '{}'", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());
        assert_eq!(store.get("registry:repos").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf());

        store.set("registry:repos", r#"["rust-lang/rust"]"#).unwrap();
        store.set("registry:repos", r#"["tokio-rs/tokio"]"#).unwrap();

        assert_eq!(
            store.get("registry:repos").unwrap().as_deref(),
            Some(r#"["tokio-rs/tokio"]"#)
        );
    }

    #[test]
    fn test_clear_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-created");
        assert!(clear_cache(&path).is_ok());
    }

    #[test]
    fn test_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        let store = DiskStore::new(path.clone());
        store.set("k", "v").unwrap();

        clear_cache(&path).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
