use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default TUI auto-refresh interval. Cached results are served until they
/// are an hour old, so this mostly re-renders ages and picks up expiries.
pub const DEFAULT_AUTO_REFRESH: &str = "15m";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// How often the TUI refreshes, as a humantime duration ("15m", "1h")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_refresh_interval: Option<String>,

    /// GitHub API base URL, for GitHub Enterprise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Where the registry and cached snapshots live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Parsed auto-refresh interval, falling back to the default
    pub fn auto_refresh(&self) -> anyhow::Result<Duration> {
        let raw = self
            .auto_refresh_interval
            .as_deref()
            .unwrap_or(DEFAULT_AUTO_REFRESH);
        let interval = humantime::parse_duration(raw)
            .map_err(|e| anyhow::anyhow!("Invalid auto_refresh_interval '{}': {}", raw, e))?;
        if interval.is_zero() {
            anyhow::bail!("auto_refresh_interval must be greater than zero");
        }
        Ok(interval)
    }
}
