//! Configuration for tablewash.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from the user config directory (`config.toml`) and/or
//! `.tablewash/config.toml` in the workspace directory.

use crate::engine::{OutputFormat, SaveMode};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WashConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// How sources are read and how much may be materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Field delimiter for delimited text. Must be a single ASCII character.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Whether the first line of delimited text names the columns.
    #[serde(default = "default_true")]
    pub has_header: bool,
    /// Rows sampled for type inference; 0 scans every row.
    #[serde(default)]
    pub infer_sample_rows: usize,
    /// Field texts read as null (after trimming).
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
    /// Ceiling for `collect`.
    #[serde(default = "default_max_collect_rows")]
    pub max_collect_rows: usize,
}

fn default_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

fn default_null_values() -> Vec<String> {
    ["", "null", "NULL", "NA", "N/A", "NaN"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_collect_rows() -> usize {
    1_000_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: true,
            infer_sample_rows: 0,
            null_values: default_null_values(),
            max_collect_rows: default_max_collect_rows(),
        }
    }
}

impl EngineConfig {
    pub fn is_null_token(&self, field: &str) -> bool {
        let field = field.trim();
        self.null_values.iter().any(|n| n == field)
    }
}

/// Defaults for materializing writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub mode: SaveMode,
}

/// Project directories used for the user config file and logs.
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "tablewash", "tablewash")
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".tablewash").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `TABLEWASH_`)
/// 3. Workspace-local config (`.tablewash/config.toml`)
/// 4. User config (`<config dir>/tablewash/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&WashConfig>,
) -> Result<WashConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(WashConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // TABLEWASH_ENGINE__DELIMITER, TABLEWASH_OUTPUT__MODE, ...
    figment = figment.merge(Env::prefixed("TABLEWASH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
