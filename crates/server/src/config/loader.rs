//! Finding and parsing the RON config file.

use super::Config;
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

const CONFIG_PATH_ENV: &str = "CMS_CONFIG_PATH";
const CONFIG_FILENAMES: &[&str] = &["cms.ron", ".cms/config.ron"];

pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_ron(&content).with_context(|| format!("in config file {}", path.display()))
}

/// First existing config file: `$CMS_CONFIG_PATH`, then `cms.ron`, then
/// `.cms/config.ron`. A path named by the env var that does not exist is
/// reported and skipped.
fn discover() -> Option<PathBuf> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    if let Some(path) = &explicit {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "{CONFIG_PATH_ENV} points at a missing file");
        }
    }

    explicit
        .into_iter()
        .chain(CONFIG_FILENAMES.iter().map(PathBuf::from))
        .find(|path| path.exists())
}

/// Load the discovered config file, or defaults when there is none.
pub fn load_with_discovery() -> Result<Config> {
    match discover() {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            load_from_file(&path)
        }
        None => {
            tracing::info!("no config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Discover, apply env overrides, and validate
pub fn load() -> Result<Config> {
    let mut config = load_with_discovery()?;
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

fn parse_ron(content: &str) -> Result<Config> {
    ron::from_str(content).context("invalid RON")
}
