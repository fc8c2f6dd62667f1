//! Configuration file support for lintpack.
//!
//! lintpack reads two optional configuration files:
//! - Global: `~/.lintpack/config.toml` - User-wide defaults
//! - Project: `lintpack.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.
//!
//! ```toml
//! [install]
//! package_manager = "pnpm"
//! skip = false
//! extra_dev_dependencies = ["eslint-plugin-storybook"]
//!
//! [ignore]
//! extra_patterns = [".turbo"]
//!
//! [patch]
//! next = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::package_manager::PackageManager;

/// File name of the project configuration.
pub const PROJECT_CONFIG_FILE: &str = "lintpack.toml";

/// lintpack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dependency installation settings
    pub install: InstallConfig,

    /// `.gitignore` settings
    pub ignore: IgnoreConfig,

    /// Framework source patch settings
    pub patch: PatchConfig,
}

/// Dependency installation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Force a package manager (pnpm, yarn, npm) instead of detecting it
    pub package_manager: Option<String>,

    /// Never invoke the package manager
    pub skip: bool,

    /// Additional dev dependencies installed for every archetype
    pub extra_dev_dependencies: Vec<String>,

    /// Template root directory
    pub templates: Option<PathBuf>,
}

/// `.gitignore` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Patterns appended after the built-in ones
    pub extra_patterns: Vec<String>,
}

/// Framework source patch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Apply the Next.js router refresh patch
    pub next: bool,
}

impl Config {
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
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.install.package_manager.is_some() {
            self.install.package_manager = other.install.package_manager;
        }
        if other.install.skip {
            self.install.skip = true;
        }
        if !other.install.extra_dev_dependencies.is_empty() {
            self.install.extra_dev_dependencies = other.install.extra_dev_dependencies;
        }
        if other.install.templates.is_some() {
            self.install.templates = other.install.templates;
        }

        if !other.ignore.extra_patterns.is_empty() {
            self.ignore.extra_patterns = other.ignore.extra_patterns;
        }

        if other.patch.next {
            self.patch.next = true;
        }
    }

    /// Parse the forced package manager, if any.
    pub fn package_manager(&self) -> Result<Option<PackageManager>> {
        self.install
            .package_manager
            .as_deref()
            .map(|s| s.parse::<PackageManager>())
            .transpose()
            .map_err(anyhow::Error::msg)
            .context("invalid `install.package_manager` in config")
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (lintpack.toml)
/// 2. Global config (~/.lintpack/config.toml)
/// 3. Defaults
pub fn load_config(project_root: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config.merge(Config::load_or_default(&global_path));
        }
    }

    let project_path = project_config_path(project_root);
    if project_path.exists() {
        config.merge(Config::load_or_default(&project_path));
    }

    config
}

/// Get the global lintpack config directory (~/.lintpack).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".lintpack"))
}

/// Get the global config path (~/.lintpack/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (lintpack.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_FILE)
}
