//! Optional config file loading. Search order: ./fichub.toml, then
//! $XDG_CONFIG_HOME/fichub/config.toml (or ~/.config/fichub/config.toml).

use crate::shape::DescriptionFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Simultaneous requests, 1 to 3. Out-of-range values are an error, not clamped.
    pub concurrency: Option<usize>,
    /// API base URL. Default https://fichub.net/api/v0.
    pub base_url: Option<String>,
    /// Story description handling: raw or markdown (default).
    pub description: Option<DescriptionFormat>,
}

fn config_paths() -> Result<Vec<PathBuf>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("fichub.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("fichub").join("config.toml"));
    }
    Ok(paths)
}

/// Read and parse one config file.
pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// Search order: (1) ./fichub.toml, (2) $XDG_CONFIG_HOME/fichub/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    for path in config_paths()? {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            return load_config_from(&path).map(Some);
        }
    }
    Ok(None)
}
