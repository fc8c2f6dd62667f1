//! Package manager detection and command construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::manifest::PackageManifest;
use crate::util::process::{find_executable, ProcessBuilder};

/// A JavaScript package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Pnpm,
    Yarn,
    Npm,
}

/// Lockfiles checked during detection, most specific first.
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
];

impl PackageManager {
    /// Detect the package manager of a project.
    ///
    /// Order: the manifest's `packageManager` field, then lockfiles, then
    /// pnpm.
    pub fn detect(project_root: &Path, manifest: &PackageManifest) -> PackageManager {
        if let Some(field) = manifest.package_manager_field() {
            let name = field.split('@').next().unwrap_or_default();
            if let Ok(manager) = name.parse() {
                tracing::debug!("package manager `{}` from packageManager field", name);
                return manager;
            }
        }

        for (lockfile, manager) in LOCKFILES {
            if project_root.join(lockfile).exists() {
                tracing::debug!("package manager `{}` from {}", manager, lockfile);
                return *manager;
            }
        }

        PackageManager::default()
    }

    /// Executable name.
    pub fn command_name(&self) -> &'static str {
        match self {
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
        }
    }

    /// Resolve the executable, falling back to the bare name so the spawn
    /// error names the missing tool.
    pub fn executable(&self) -> PathBuf {
        let name = self.command_name();
        find_executable(name).unwrap_or_else(|| PathBuf::from(name))
    }

    /// Path of the resolution pin object inside `package.json`.
    pub fn overrides_path(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Pnpm => &["pnpm", "overrides"],
            PackageManager::Yarn => &["resolutions"],
            PackageManager::Npm => &["overrides"],
        }
    }

    /// Whether the manager supports `patch` / `patch-commit`.
    pub fn supports_patching(&self) -> bool {
        matches!(self, PackageManager::Pnpm)
    }

    /// Arguments to add development dependencies.
    pub fn add_dev_args(&self, packages: &[String]) -> Vec<String> {
        let mut args: Vec<String> = match self {
            PackageManager::Pnpm => vec!["add".into(), "--save-dev".into()],
            PackageManager::Yarn => vec!["add".into(), "--dev".into()],
            PackageManager::Npm => vec!["install".into(), "--save-dev".into()],
        };
        args.extend(packages.iter().cloned());
        args
    }

    /// Arguments for a plain install.
    pub fn install_args(&self) -> Vec<String> {
        vec!["install".to_string()]
    }

    /// `add` command for `packages`, or `install` when there is nothing to add.
    pub fn install_command(&self, project_root: &Path, packages: &[String]) -> ProcessBuilder {
        let args = if packages.is_empty() {
            self.install_args()
        } else {
            self.add_dev_args(packages)
        };
        ProcessBuilder::new(self.executable())
            .args(args)
            .cwd(project_root)
    }

    /// `pnpm list <package> --json`.
    pub fn list_command(&self, project_root: &Path, package: &str) -> ProcessBuilder {
        ProcessBuilder::new(self.executable())
            .args(["list", package, "--json"])
            .cwd(project_root)
    }

    /// `pnpm patch <spec> --edit-dir <dir>`.
    pub fn patch_command(&self, project_root: &Path, spec: &str, edit_dir: &Path) -> ProcessBuilder {
        ProcessBuilder::new(self.executable())
            .args(["patch", spec, "--edit-dir"])
            .arg(edit_dir)
            .cwd(project_root)
    }

    /// `pnpm patch-commit <dir>`.
    pub fn patch_commit_command(&self, project_root: &Path, edit_dir: &Path) -> ProcessBuilder {
        ProcessBuilder::new(self.executable())
            .arg("patch-commit")
            .arg(edit_dir)
            .cwd(project_root)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pnpm" => Ok(PackageManager::Pnpm),
            "yarn" => Ok(PackageManager::Yarn),
            "npm" => Ok(PackageManager::Npm),
            _ => Err(format!(
                "invalid package manager '{}'; expected 'pnpm', 'yarn', or 'npm'",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(json: &str) -> PackageManifest {
        PackageManifest::parse(json).unwrap()
    }

    #[test]
    fn test_detect_defaults_to_pnpm() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            PackageManager::detect(tmp.path(), &manifest("{}")),
            PackageManager::Pnpm
        );
    }

    #[test]
    fn test_detect_from_lockfile() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("yarn.lock"), "").unwrap();
        assert_eq!(
            PackageManager::detect(tmp.path(), &manifest("{}")),
            PackageManager::Yarn
        );
    }

    #[test]
    fn test_package_manager_field_beats_lockfile() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("package-lock.json"), "{}").unwrap();
        assert_eq!(
            PackageManager::detect(tmp.path(), &manifest(r#"{"packageManager": "pnpm@9.12.0"}"#)),
            PackageManager::Pnpm
        );
    }

    #[test]
    fn test_add_dev_args() {
        let packages = vec!["eslint".to_string(), "prettier".to_string()];
        assert_eq!(
            PackageManager::Pnpm.add_dev_args(&packages),
            ["add", "--save-dev", "eslint", "prettier"]
        );
        assert_eq!(
            PackageManager::Yarn.add_dev_args(&packages),
            ["add", "--dev", "eslint", "prettier"]
        );
        assert_eq!(
            PackageManager::Npm.add_dev_args(&packages),
            ["install", "--save-dev", "eslint", "prettier"]
        );
    }

    #[test]
    fn test_install_command_without_packages() {
        let cmd = PackageManager::Npm.install_command(Path::new("/project"), &[]);
        assert_eq!(cmd.get_args(), ["install"]);
        assert_eq!(cmd.get_cwd(), Some(Path::new("/project")));
    }

    #[test]
    fn test_parse() {
        assert_eq!("PNPM".parse::<PackageManager>().unwrap(), PackageManager::Pnpm);
        assert!("bun".parse::<PackageManager>().is_err());
    }
}
