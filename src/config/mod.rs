mod schema;

pub use schema::{Config, DEFAULT_AUTO_REFRESH};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Environment variable holding an optional GitHub token
pub const ENV_TOKEN_VAR: &str = "RELWATCH_GH_TOKEN";

/// Get the config directory path (~/.config/relwatch/)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("relwatch"))
        .unwrap_or_else(|| PathBuf::from(".relwatch"))
}

/// Get the default config file path (~/.config/relwatch/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Token from `RELWATCH_GH_TOKEN`, if set and non-empty
pub fn get_token_from_env() -> Option<String> {
    std::env::var(ENV_TOKEN_VAR)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses default path (~/.config/relwatch/config.yaml)
///
/// A missing file at the default path yields the defaults. A missing file at
/// an explicitly given path is an error.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed or holds invalid values
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        log::debug!("No config at {}, using defaults", config_path.display());
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

/// Parse and validate config text
pub fn parse_config(content: &str) -> Result<Config> {
    // An empty file is a valid, all-defaults config
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_saphyr::from_str(content)?;
    config.auto_refresh()?;
    Ok(config)
}
