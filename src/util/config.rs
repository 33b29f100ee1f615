//! Configuration file support for cdep.
//!
//! cdep reads two configuration file locations:
//! - Global: `~/.cdep/config.toml` - User-wide defaults
//! - Project: `.cdep/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Generator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Where generated and downloaded files live
    pub paths: PathsConfig,

    /// How generated build scripts call back into cdep
    pub callback: CallbackConfig,
}

/// Folder settings. Relative folders resolve against the working folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Folder the build runs from (default: current directory)
    pub working_folder: Option<PathBuf>,

    /// Where archives are unpacked (default: ~/.cdep/exploded)
    pub exploded_folder: Option<PathBuf>,

    /// Where build-system fragments are written (default: .cdep/modules)
    pub modules_folder: Option<PathBuf>,

    /// Where example projects are written (default: .cdep/examples)
    pub examples_folder: Option<PathBuf>,
}

/// Fetch-archive callback settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Command prefix, e.g. `["cdep", "--working-folder", "."]`
    pub command: Vec<String>,
}

impl GeneratorConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: GeneratorConfig) {
        if other.paths.working_folder.is_some() {
            self.paths.working_folder = other.paths.working_folder;
        }
        if other.paths.exploded_folder.is_some() {
            self.paths.exploded_folder = other.paths.exploded_folder;
        }
        if other.paths.modules_folder.is_some() {
            self.paths.modules_folder = other.paths.modules_folder;
        }
        if other.paths.examples_folder.is_some() {
            self.paths.examples_folder = other.paths.examples_folder;
        }
        if !other.callback.command.is_empty() {
            self.callback.command = other.callback.command;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.cdep/config.toml)
/// 2. Global config (~/.cdep/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> GeneratorConfig {
    let mut config = GeneratorConfig::default();

    if let Some(global_path) = global_path {
        config.merge(GeneratorConfig::load_or_default(global_path));
    }

    config.merge(GeneratorConfig::load_or_default(project_path));

    config
}

/// Get the global cdep directory (~/.cdep).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cdep"))
}

/// Get the global config path (~/.cdep/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.cdep/config.toml).
pub fn project_config_path(working_folder: &Path) -> PathBuf {
    working_folder.join(".cdep").join("config.toml")
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match directories::BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
