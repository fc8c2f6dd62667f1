//! Patching the installed Next.js source.
//!
//! The stage opens a `pnpm patch` edit directory for the installed `next`,
//! rewrites a few files with anchored regex replacements, and commits the
//! result as a patch file. Every replacement must match; a pattern that no
//! longer matches means the upstream source changed and the whole run is
//! aborted instead of committing a half-applied patch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use regex::Regex;
use semver::Version;
use serde_json::Value;
use thiserror::Error;

use crate::core::manifest::{PackageManifest, MANIFEST_FILE};
use crate::core::package_manager::PackageManager;
use crate::util::fs::{display_relative, read_to_string, remove_dir_all_if_exists, write_string};
use crate::util::process::CommandRunner;
use crate::util::{Shell, Status};

/// Package whose source is patched.
pub const PATCHED_PACKAGE: &str = "next";

/// Edit directory, relative to the project root.
pub const EDIT_DIR: &str = "node_modules/.lintpack-next-patch";

/// Source patch failures.
#[derive(Debug, Error, Diagnostic)]
pub enum PatchError {
    #[error("pattern \"{name}\" not matched\n\nRegex: /{regex}/m\nSource link: {source_link}")]
    #[diagnostic(
        code(lintpack::patch::pattern_not_matched),
        help("The installed source changed; compare it with the source link and update the pattern")
    )]
    PatternNotMatched {
        name: String,
        regex: String,
        source_link: String,
    },

    #[error("could not determine the installed version of `{package}`")]
    #[diagnostic(
        code(lintpack::patch::version_not_found),
        help("Run the package manager install first so `{package}` is in node_modules")
    )]
    VersionNotFound { package: String },
}

/// A single anchored rewrite.
#[derive(Debug, Clone)]
pub struct Replacement {
    /// Line in the upstream file, for the source link.
    pub line_number: u32,
    pub name: &'static str,
    pub pattern: Regex,
    /// Replacement with `${n}` group references.
    pub replacement: &'static str,
}

/// Replacements applied to one file of the package.
#[derive(Debug, Clone)]
pub struct SourceTransform {
    /// Path inside the package, `/`-separated.
    pub file: &'static str,
    pub replacements: Vec<Replacement>,
}

/// Make app router navigations refresh server components.
pub fn next_transforms() -> Result<Vec<SourceTransform>> {
    Ok(vec![
        SourceTransform {
            file: "dist/client/components/layout-router.js",
            replacements: vec![Replacement {
                line_number: 318,
                name: "useEffect, router.replace()",
                pattern: Regex::new(
                    r"(?m)^( +\(0, _react\)\.useEffect\(\(\)=>\{\n)( +)(router\.replace\(redirect, \{\}\);\n)( +\}, \[)",
                )?,
                replacement: "${1}${2}${3}${2}router.refresh();\n${4}",
            }],
        },
        SourceTransform {
            file: "dist/client/link.js",
            replacements: vec![Replacement {
                line_number: 85,
                name: "isAppRouter, _react.default.startTransition()",
                pattern: Regex::new(
                    r"(?m)^( +)(_react\.default\.startTransition\(navigate\);\n)( +\} else \{)",
                )?,
                replacement: "${1}${2}${1}router.refresh();\n${3}",
            }],
        },
    ])
}

/// Link to the upstream source line, for manual inspection.
pub fn source_link(package: &str, version: &Version, file: &str, line_number: u32) -> String {
    format!(
        "https://www.runpkg.com/?{}@{}/{}#{}",
        package, version, file, line_number
    )
}

/// Apply `replacements` to `content` in order.
///
/// The first replacement whose pattern does not match aborts; later ones are
/// not attempted.
pub fn apply_replacements(
    file: &str,
    version: &Version,
    content: &str,
    replacements: &[Replacement],
) -> Result<String, PatchError> {
    let mut content = content.to_string();

    for replacement in replacements {
        if !replacement.pattern.is_match(&content) {
            return Err(PatchError::PatternNotMatched {
                name: replacement.name.to_string(),
                regex: replacement
                    .pattern
                    .as_str()
                    .trim_start_matches("(?m)")
                    .to_string(),
                source_link: source_link(PATCHED_PACKAGE, version, file, replacement.line_number),
            });
        }

        content = replacement
            .pattern
            .replacen(&content, 1, replacement.replacement)
            .into_owned();
    }

    Ok(content)
}

/// Rewrite each transform's file inside `edit_dir`, stopping at the first
/// failure.
pub fn apply_transforms(
    edit_dir: &Path,
    version: &Version,
    transforms: &[SourceTransform],
    shell: &Shell,
) -> Result<()> {
    for transform in transforms {
        shell.status(
            Status::Patching,
            format!("node_modules/{}/{}", PATCHED_PACKAGE, transform.file),
        );

        let path = edit_dir.join(transform.file);
        let content = read_to_string(&path)?;
        let patched = apply_replacements(transform.file, version, &content, &transform.replacements)?;
        write_string(&path, &patched)?;
    }
    Ok(())
}

/// Read the installed version from `pnpm list <package> --json` output.
pub fn parse_installed_version(list_json: &str, package: &str) -> Result<Version> {
    let value: Value =
        serde_json::from_str(list_json).context("failed to parse package list output")?;

    let version = value
        .get(0)
        .and_then(|project| project.get("dependencies"))
        .and_then(|deps| deps.get(package))
        .and_then(|dep| dep.get("version"))
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::VersionNotFound {
            package: package.to_string(),
        })?;

    Version::parse(version).with_context(|| format!("invalid version `{}` for `{}`", version, package))
}

/// Delete `patches/next@*` files left by previous runs.
pub fn remove_stale_patch_files(project_root: &Path) -> Result<Vec<PathBuf>> {
    let patches_dir = project_root.join("patches");
    if !patches_dir.is_dir() {
        return Ok(Vec::new());
    }

    let prefix = format!("{}@", PATCHED_PACKAGE);
    let mut removed = Vec::new();
    for entry in fs::read_dir(&patches_dir)
        .with_context(|| format!("failed to read {}", patches_dir.display()))?
    {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            fs::remove_file(entry.path())
                .with_context(|| format!("failed to remove {}", entry.path().display()))?;
            removed.push(entry.path());
        }
    }
    removed.sort();
    Ok(removed)
}

/// Everything the patch stage needs from the installer.
pub struct PatchContext<'a> {
    pub project_root: &'a Path,
    pub manager: PackageManager,
    pub runner: &'a dyn CommandRunner,
    pub shell: &'a Shell,
}

/// Run the whole patch stage against the installed `next`.
///
/// Returns the patched version.
pub fn run_patch_stage(ctx: &PatchContext<'_>, transforms: &[SourceTransform]) -> Result<Version> {
    let root = ctx.project_root;
    let manifest_path = root.join(MANIFEST_FILE);

    // Previous patch records would make `pnpm patch` start from patched source.
    let mut manifest = PackageManifest::load(&manifest_path)?;
    let prefix = format!("{}@", PATCHED_PACKAGE);
    if manifest.remove_patched_dependencies(&prefix) > 0 {
        manifest.save(&manifest_path)?;
        ctx.shell
            .status(Status::Removed, "previous Next.js patch from package.json");
    }
    for path in remove_stale_patch_files(root)? {
        ctx.shell.status(Status::Removed, display_relative(root, &path));
    }

    let list_output = ctx
        .runner
        .output(&ctx.manager.list_command(root, PATCHED_PACKAGE))?;
    let version = parse_installed_version(&list_output, PATCHED_PACKAGE)?;
    tracing::debug!("patching {}@{}", PATCHED_PACKAGE, version);

    let edit_dir = root.join(EDIT_DIR);
    remove_dir_all_if_exists(&edit_dir)?;

    let spec = format!("{}@{}", PATCHED_PACKAGE, version);
    ctx.runner
        .output(&ctx.manager.patch_command(root, &spec, &edit_dir))?;

    apply_transforms(&edit_dir, &version, transforms, ctx.shell)?;

    ctx.shell.note("Generating patch...");
    ctx.runner
        .run(&ctx.manager.patch_commit_command(root, &edit_dir))?;

    remove_dir_all_if_exists(&edit_dir)?;
    Ok(version)
}
