//! Defaults for `pipegen-ctl`, read from `.pipegen.toml`.
//!
//! Command-line flags always win over values from the config file.

pub(crate) mod loader;

pub(crate) use loader::load_cli_config;

use serde::Deserialize;

fn default_root() -> String {
    ".".to_string()
}

fn default_output() -> String {
    "pipeline.generated.yaml".to_string()
}

fn default_worldgroup_name() -> String {
    "WORLD".to_string()
}

/// Settings that can be pinned per project instead of passed as flags.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CliConfig {
    /// Folder holding `jobs`, `resources`, `resource_types`, `groups` and `partials`.
    #[serde(default = "default_root")]
    pub root: String,

    /// Path of the generated pipeline document.
    #[serde(default = "default_output")]
    pub output: String,

    /// Pipeline to generate. Empty selects the default pipeline.
    #[serde(default)]
    pub pipeline: String,

    /// Prepend a group listing every job and resource.
    #[serde(default)]
    pub worldgroup: bool,

    /// Name of that group.
    #[serde(default = "default_worldgroup_name")]
    pub worldgroup_name: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            output: default_output(),
            pipeline: String::new(),
            worldgroup: false,
            worldgroup_name: default_worldgroup_name(),
        }
    }
}
