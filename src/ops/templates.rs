//! Copying template config files into a project.
//!
//! Each archetype has a template directory holding files and at most one
//! level of subdirectories. Files that already exist in the project are left
//! alone, except for a short list that lintpack always owns.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::core::archetype::Archetype;
use crate::util::config::Config;
use crate::util::fs::{display_relative, ensure_dir};
use crate::util::{Shell, Status};

/// One file of a template set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path relative to the template directory, `/`-separated.
    pub name: String,
    /// Absolute path of the template file.
    pub path: PathBuf,
}

/// Outcome of copying a template set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub copied: Vec<String>,
    pub overwritten: Vec<String>,
    /// Owned files that already matched the template.
    pub unchanged: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl CopyReport {
    /// Whether any file in the project changed.
    pub fn changed(&self) -> bool {
        !self.copied.is_empty() || !self.overwritten.is_empty()
    }
}

/// Decide whether an existing project file is replaced by the template.
pub fn always_overwrite(name: &str, archetype: Archetype) -> bool {
    match name {
        "tsconfig.json" => true,
        "prettier.config.mjs" => archetype.has_database(),
        _ => false,
    }
}

/// List the files of a template directory.
///
/// Directories nested deeper than one level are not descended into.
pub fn collect_templates(template_dir: &Path) -> Result<Vec<TemplateFile>> {
    if !template_dir.is_dir() {
        bail!("template directory not found: {}", template_dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(template_dir)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("failed to read templates in {}", template_dir.display()))?;

        if entry.file_type().is_dir() {
            if entry.depth() == 2 {
                tracing::debug!(
                    "ignoring nested template directory {}",
                    display_relative(template_dir, entry.path())
                );
            }
            continue;
        }

        files.push(TemplateFile {
            name: display_relative(template_dir, entry.path()),
            path: entry.path().to_path_buf(),
        });
    }

    Ok(files)
}

/// Copy the template set of `archetype` into `project_root`.
///
/// A failure to copy one file is reported and counted; the remaining files
/// are still copied.
pub fn copy_templates(
    template_dir: &Path,
    project_root: &Path,
    archetype: Archetype,
    shell: &Shell,
) -> Result<CopyReport> {
    let templates = collect_templates(template_dir)?;
    let mut report = CopyReport::default();

    for template in templates {
        let destination = project_root.join(&template.name);

        let overwrite = destination.exists();
        if overwrite && !always_overwrite(&template.name, archetype) {
            shell.status(
                Status::Skipped,
                format!("copy of {} (file already exists)", template.name),
            );
            report.skipped.push(template.name);
            continue;
        }
        if overwrite && same_contents(&template.path, &destination) {
            shell.verbose(
                Status::Skipped,
                format!("copy of {} (already up to date)", template.name),
            );
            report.unchanged.push(template.name);
            continue;
        }

        match copy_one(&template.path, &destination) {
            Ok(()) if overwrite => {
                shell.status(
                    Status::Copied,
                    format!("{} (existing file overwritten)", template.name),
                );
                report.overwritten.push(template.name);
            }
            Ok(()) => {
                shell.status(Status::Copied, &template.name);
                report.copied.push(template.name);
            }
            Err(e) => {
                tracing::warn!("{:#}", e);
                shell.error(format!("failed to copy {}: {:#}", template.name, e));
                report.failed.push(template.name);
            }
        }
    }

    Ok(report)
}

/// Whether both files can be read and hold the same bytes.
fn same_contents(a: &Path, b: &Path) -> bool {
    match (fs::read(a), fs::read(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_one(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(source, destination).with_context(|| {
        format!(
            "failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    Ok(())
}

/// Find the template root directory.
///
/// Order: explicit path (flag or `LINTPACK_TEMPLATES`), config, then
/// `templates/` next to the installed binary, then the source checkout.
pub fn resolve_template_root(explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
    if let Some(path) = explicit.or(config.install.templates.as_deref()) {
        if !path.is_dir() {
            bail!("template directory not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }

    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(bin_dir) = exe.parent() {
            candidates.push(bin_dir.join("..").join("templates"));
            candidates.push(bin_dir.join("..").join("share").join("lintpack").join("templates"));
        }
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("templates"));

    candidates
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .context("could not locate the lintpack templates directory; pass --templates")
}
