//! Config file discovery and loading for `.pipegen.toml`.
//!
//! Checks two locations in precedence order:
//! 1. `./.pipegen.toml` (project-local)
//! 2. `~/.config/pipegen.toml` (user-global)

use std::path::{Path, PathBuf};

use super::CliConfig;

const CONFIG_FILENAME: &str = ".pipegen.toml";
const GLOBAL_CONFIG_DIR: &str = ".config";
const GLOBAL_CONFIG_FILENAME: &str = "pipegen.toml";

/// Load CLI config from the first discovered location, or return defaults.
pub(crate) fn load_cli_config() -> CliConfig {
    match find_config_file() {
        Some(path) => load_from(&path),
        None => CliConfig::default(),
    }
}

/// Parse the config at `path`, falling back to defaults when it is unusable.
pub(crate) fn load_from(path: &Path) -> CliConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!(?path, "Loaded CLI config");
                config
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "Failed to parse CLI config, using defaults");
                CliConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(?path, error = %e, "Failed to read CLI config, using defaults");
            CliConfig::default()
        }
    }
}

/// Search for config file in precedence order.
fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }

    if let Some(home) = home_dir() {
        let global = home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME);
        if global.is_file() {
            return Some(global);
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
