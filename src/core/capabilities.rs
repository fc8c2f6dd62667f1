//! Optional-feature descriptor.
//!
//! Everything that depends on the host (platform, CI, database environment
//! variables) is probed once, up front, into a [`Capabilities`] value. The
//! rest of the installer only reads these flags.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use miette::Diagnostic;
use thiserror::Error;

use crate::core::archetype::Archetype;
use crate::core::package_manager::PackageManager;

/// Environment variables SafeQL needs to reach the development database.
pub const SAFEQL_ENV_VARS: [&str; 4] = ["PGHOST", "PGUSERNAME", "PGPASSWORD", "PGDATABASE"];

/// Project file holding the local development environment.
pub const DOTENV_FILE: &str = ".env";

/// Host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// The platform this binary runs on.
    pub fn current() -> Platform {
        Platform::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Platform {
        match os {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }

    /// `libpg-query` (the SafeQL parser) has no Windows build.
    pub fn supports_safeql(&self) -> bool {
        !matches!(self, Platform::Windows)
    }

    /// The framework source patch relies on POSIX paths in the patch file.
    pub fn supports_source_patch(&self) -> bool {
        !matches!(self, Platform::Windows)
    }
}

/// Whether the SafeQL SQL lint integration can be set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeqlSupport {
    /// The project has no database.
    NotApplicable,
    Enabled,
    UnsupportedPlatform,
    /// Required variables that are unset or empty.
    MissingEnv(Vec<String>),
}

/// Whether the framework source patch stage runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSupport {
    /// Not requested, or the project has no Next.js.
    Disabled,
    Enabled,
    /// Requested but impossible here.
    Unsupported(String),
}

/// Fatal SafeQL setup failure.
#[derive(Debug, Error, Diagnostic)]
pub enum SafeqlError {
    #[error("SafeQL configuration failed: environment variables not set: {}", .missing.join(", "))]
    #[diagnostic(
        code(lintpack::safeql::missing_env),
        help("Set the variables in CI, or in a `.env` file for local development")
    )]
    MissingEnv { missing: Vec<String> },
}

/// Capability flags resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub platform: Platform,
    /// Running under CI (`CI` set to anything but `false`/`0`).
    pub ci: bool,
    pub safeql: SafeqlSupport,
    pub next_patch: PatchSupport,
}

impl Capabilities {
    /// Resolve capabilities from the process environment and the project's
    /// `.env` file.
    pub fn from_env(
        project_root: &Path,
        archetype: Archetype,
        manager: PackageManager,
        patch_requested: bool,
    ) -> Result<Capabilities> {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        merge_dotenv(&mut env, project_root)?;
        Ok(Capabilities::resolve(
            archetype,
            manager,
            patch_requested,
            &env,
            Platform::current(),
        ))
    }

    /// Resolve capabilities from an explicit environment.
    pub fn resolve(
        archetype: Archetype,
        manager: PackageManager,
        patch_requested: bool,
        env: &HashMap<String, String>,
        platform: Platform,
    ) -> Capabilities {
        let ci = env
            .get("CI")
            .is_some_and(|v| !v.is_empty() && v != "false" && v != "0");

        let safeql = if !archetype.has_database() {
            SafeqlSupport::NotApplicable
        } else if !platform.supports_safeql() {
            SafeqlSupport::UnsupportedPlatform
        } else {
            let missing: Vec<String> = SAFEQL_ENV_VARS
                .iter()
                .filter(|var| env.get(**var).map_or(true, |v| v.is_empty()))
                .map(|var| var.to_string())
                .collect();
            if missing.is_empty() {
                SafeqlSupport::Enabled
            } else {
                SafeqlSupport::MissingEnv(missing)
            }
        };

        let next_patch = if !patch_requested || !archetype.is_next() {
            PatchSupport::Disabled
        } else if !platform.supports_source_patch() {
            PatchSupport::Unsupported("source patching is not supported on Windows".to_string())
        } else if !manager.supports_patching() {
            PatchSupport::Unsupported(format!("`{}` cannot create patches; use pnpm", manager))
        } else {
            PatchSupport::Enabled
        };

        Capabilities {
            platform,
            ci,
            safeql,
            next_patch,
        }
    }

    /// Fail on conditions that are only fatal in CI.
    ///
    /// Outside CI a missing database environment just disables SafeQL.
    pub fn check(&self) -> Result<(), SafeqlError> {
        match &self.safeql {
            SafeqlSupport::MissingEnv(missing) if self.ci => Err(SafeqlError::MissingEnv {
                missing: missing.clone(),
            }),
            SafeqlSupport::MissingEnv(missing) => {
                tracing::debug!("skipping SafeQL, unset: {}", missing.join(", "));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Whether SafeQL dependencies should be installed.
    pub fn safeql_enabled(&self) -> bool {
        self.safeql == SafeqlSupport::Enabled
    }

    /// Whether the Next.js patch stage runs.
    pub fn next_patch_enabled(&self) -> bool {
        self.next_patch == PatchSupport::Enabled
    }
}

/// Fill unset or empty variables in `env` from `<project_root>/.env`.
///
/// Variables already set in the process environment win. A missing file is
/// not an error.
pub fn merge_dotenv(env: &mut HashMap<String, String>, project_root: &Path) -> Result<()> {
    let path = project_root.join(DOTENV_FILE);
    if !path.is_file() {
        return Ok(());
    }

    tracing::debug!("loading {}", path.display());
    let entries = dotenvy::from_path_iter(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    for entry in entries {
        let (key, value) = entry.with_context(|| format!("failed to parse {}", path.display()))?;
        match env.get(&key) {
            Some(current) if !current.is_empty() => {}
            _ => {
                env.insert(key, value);
            }
        }
    }
    Ok(())
}
