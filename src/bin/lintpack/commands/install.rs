//! `lintpack install` command

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::InstallArgs;
use lintpack::ops::{find_project_root, install, InstallOptions, InstallReport};
use lintpack::util::config::load_config;
use lintpack::util::{ProcessRunner, Shell};

pub fn execute(args: InstallArgs, shell: &Shell) -> Result<()> {
    let start = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("failed to read the current directory")?,
    };
    let project_root = find_project_root(&start)?;

    // Load configuration (global + project); CLI flags override it
    let config = load_config(&project_root);

    let opts = InstallOptions {
        project_root,
        archetype: args.archetype,
        templates: args.templates,
        package_manager: args.package_manager,
        no_install: args.no_install,
        dry_run: args.dry_run,
        patch_next: args.patch_next,
        config,
    };

    let report = install(&opts, &ProcessRunner, shell)?;

    if shell.is_json() {
        shell.json_event(&summary(&report, opts.dry_run));
    } else if !opts.dry_run && !report.changed() {
        shell.note("project already up to date");
    }

    Ok(())
}

fn summary(report: &InstallReport, dry_run: bool) -> serde_json::Value {
    let templates = report.templates.clone().unwrap_or_default();
    json!({
        "reason": "install-finished",
        "dry_run": dry_run,
        "archetype": report.archetype.tag(),
        "package_manager": report.package_manager.to_string(),
        "dev_dependencies": report.plan.dev_dependencies,
        "installed": report.installed,
        "copied": templates.copied,
        "overwritten": templates.overwritten,
        "unchanged": templates.unchanged,
        "skipped": templates.skipped,
        "failed": templates.failed,
        "gitignore_updated": report.gitignore_updated,
        "workspace_updated": report.workspace_updated,
        "patched": report.patched.as_ref().map(ToString::to_string),
        "changed": report.changed(),
    })
}
