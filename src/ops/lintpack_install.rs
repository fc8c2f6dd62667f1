//! Implementation of `lintpack install`.
//!
//! The installer is a straight line of stages. Each stage reads the project
//! state it needs from disk and leaves the project in a state a second run
//! recognizes as done.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;

use crate::core::archetype::{classify, Archetype};
use crate::core::capabilities::{Capabilities, PatchSupport};
use crate::core::manifest::{PackageManifest, MANIFEST_FILE};
use crate::core::package_manager::PackageManager;
use crate::ops::patch::{next_transforms, run_patch_stage, PatchContext};
use crate::ops::plan::InstallPlan;
use crate::ops::reconcile::{
    reconcile_gitignore, reconcile_workspace_settings, remove_default_jsconfig, GITIGNORE_FILE,
    WORKSPACE_FILE,
};
use crate::ops::templates::{copy_templates, resolve_template_root, CopyReport};
use crate::util::config::Config;
use crate::util::process::CommandRunner;
use crate::util::{Shell, Status};

/// Options for the install command.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Directory holding the project's `package.json`.
    pub project_root: PathBuf,
    /// Skip detection and use this archetype.
    pub archetype: Option<Archetype>,
    /// Template root; falls back to config and the installed location.
    pub templates: Option<PathBuf>,
    /// Skip detection and use this package manager.
    pub package_manager: Option<PackageManager>,
    /// Do not invoke the package manager.
    pub no_install: bool,
    /// Print the plan without changing anything.
    pub dry_run: bool,
    /// Run the Next.js source patch stage.
    pub patch_next: bool,
    /// Merged configuration files.
    pub config: Config,
}

/// What an install run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub archetype: Archetype,
    pub package_manager: PackageManager,
    pub plan: InstallPlan,
    /// Whether `package.json` was rewritten.
    pub manifest_updated: bool,
    /// Whether the package manager was invoked.
    pub installed: bool,
    /// `None` on a dry run.
    pub templates: Option<CopyReport>,
    pub jsconfig_removed: bool,
    pub gitignore_updated: bool,
    pub workspace_updated: bool,
    /// Version of `next` that was patched.
    pub patched: Option<Version>,
}

impl InstallReport {
    fn new(archetype: Archetype, package_manager: PackageManager, plan: InstallPlan) -> Self {
        InstallReport {
            archetype,
            package_manager,
            plan,
            manifest_updated: false,
            installed: false,
            templates: None,
            jsconfig_removed: false,
            gitignore_updated: false,
            workspace_updated: false,
            patched: None,
        }
    }

    /// Whether any file in the project changed.
    pub fn changed(&self) -> bool {
        self.manifest_updated
            || self.templates.as_ref().is_some_and(CopyReport::changed)
            || self.jsconfig_removed
            || self.gitignore_updated
            || self.workspace_updated
            || self.patched.is_some()
    }
}

/// Install the lint configuration into a project.
pub fn install(
    opts: &InstallOptions,
    runner: &dyn CommandRunner,
    shell: &Shell,
) -> Result<InstallReport> {
    let root = opts.project_root.as_path();
    let manifest_path = root.join(MANIFEST_FILE);
    let mut manifest = PackageManifest::load(&manifest_path)
        .with_context(|| format!("no usable {} in {}", MANIFEST_FILE, root.display()))?;

    let archetype = match opts.archetype {
        Some(archetype) => archetype,
        None => classify(&manifest.dependencies()),
    };
    shell.status(Status::Detected, format!("project type: {}", archetype.title()));

    let manager = match opts.package_manager {
        Some(manager) => manager,
        None => match opts.config.package_manager()? {
            Some(manager) => manager,
            None => PackageManager::detect(root, &manifest),
        },
    };
    shell.verbose(Status::Info, format!("using package manager {}", manager));

    let capabilities = Capabilities::from_env(
        root,
        archetype,
        manager,
        opts.patch_next || opts.config.patch.next,
    )?;
    capabilities.check()?;
    if let PatchSupport::Unsupported(reason) = &capabilities.next_patch {
        shell.warn(format!("skipping Next.js patch: {}", reason));
    }

    let plan = InstallPlan::build(archetype, &capabilities, &manifest, &opts.config);
    let mut report = InstallReport::new(archetype, manager, plan);

    if opts.dry_run {
        print_plan(&report.plan, manager, shell);
        return Ok(report);
    }

    report.manifest_updated = update_manifest(&mut manifest, &report.plan, manager, shell)?;
    if report.manifest_updated {
        manifest.save(&manifest_path)?;
    }

    if opts.no_install || opts.config.install.skip {
        shell.verbose(
            Status::Skipped,
            format!("running {} (installation disabled)", manager),
        );
    } else {
        if !report.plan.is_empty() {
            shell.status(
                Status::Installing,
                format!(
                    "{} ESLint config {}: {}",
                    report.plan.dev_dependencies.len(),
                    if report.plan.dev_dependencies.len() == 1 {
                        "dependency"
                    } else {
                        "dependencies"
                    },
                    report.plan.dev_dependencies.join(", ")
                ),
            );
        }
        runner.run(&report.plan.command(manager, root))?;
        report.installed = true;
        shell.done("Done installing dependencies");
    }

    let template_root = resolve_template_root(opts.templates.as_deref(), &opts.config)?;
    let templates = copy_templates(&template_root.join(archetype.tag()), root, archetype, shell)?;
    if !templates.failed.is_empty() {
        shell.warn(format!(
            "{} config file(s) could not be copied",
            templates.failed.len()
        ));
    }
    report.templates = Some(templates);
    shell.done("Done copying config files");

    report.jsconfig_removed = remove_default_jsconfig(root, archetype)?;
    if report.jsconfig_removed {
        shell.done("Done removing default Next.js jsconfig.json config");
    }

    report.gitignore_updated = reconcile_gitignore(root, &opts.config.ignore.extra_patterns)?;
    if report.gitignore_updated {
        shell.status(Status::Updated, GITIGNORE_FILE);
        shell.done(format!("Done updating {}", GITIGNORE_FILE));
    }

    if manager == PackageManager::Pnpm {
        report.workspace_updated = reconcile_workspace_settings(root)?;
        if report.workspace_updated {
            shell.status(Status::Updated, WORKSPACE_FILE);
            shell.done(format!("Done updating {}", WORKSPACE_FILE));
        }
    }

    if capabilities.next_patch_enabled() {
        let ctx = PatchContext {
            project_root: root,
            manager,
            runner,
            shell,
        };
        let version = run_patch_stage(&ctx, &next_transforms()?)?;
        shell.done(format!("Done patching Next.js {}", version));
        report.patched = Some(version);
    }

    Ok(report)
}

/// Apply the `package.json` edits that must precede installation.
///
/// Returns whether the manifest changed.
fn update_manifest(
    manifest: &mut PackageManifest,
    plan: &InstallPlan,
    manager: PackageManager,
    shell: &Shell,
) -> Result<bool> {
    let mut changed = false;

    // ESLint only reads an ESM flat config through the package type.
    if manifest.set_module_type() {
        shell.status(Status::Updated, "\"type\": \"module\" in package.json");
        changed = true;
    }

    let pinned = manifest
        .pin_overrides(manager, &plan.overrides)
        .with_context(|| format!("failed to record resolution pins in {}", MANIFEST_FILE))?;
    for package in &pinned {
        shell.status(
            Status::Updated,
            format!("resolution for {} in {}", package, MANIFEST_FILE),
        );
    }
    changed |= !pinned.is_empty();

    Ok(changed)
}

fn print_plan(plan: &InstallPlan, manager: PackageManager, shell: &Shell) {
    if plan.is_empty() {
        shell.note("all ESLint config dependencies already installed");
    } else {
        shell.note(format!(
            "would install {}: {}",
            plan.describe_count(),
            plan.dev_dependencies.join(", ")
        ));
    }
    for (package, version) in &plan.overrides {
        shell.note(format!(
            "would pin {}@{} in `{}`",
            package,
            version,
            manager.overrides_path().join(".")
        ));
    }
}

/// Locate the project root: the nearest ancestor of `start` with a
/// `package.json`.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
        .with_context(|| {
            format!(
                "could not find {} in {} or any parent directory",
                MANIFEST_FILE,
                start.display()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockRunner, ProjectFixture, Workspace};
    use serde_json::Value;
    use std::fs;

    fn options(ws: &Workspace) -> InstallOptions {
        InstallOptions {
            project_root: ws.project(),
            templates: Some(ws.templates()),
            package_manager: Some(PackageManager::Pnpm),
            ..InstallOptions::default()
        }
    }

    fn manifest_json(ws: &Workspace) -> Value {
        serde_json::from_str(&ws.read(MANIFEST_FILE)).unwrap()
    }

    #[test]
    fn test_node_project_install() {
        let ws = Workspace::new(&ProjectFixture::new());
        let runner = MockRunner::new();

        let report = install(&options(&ws), &runner, &Shell::quiet()).unwrap();

        assert_eq!(report.archetype, Archetype::NodeJs);
        assert!(report.installed);
        assert_eq!(
            runner.calls(),
            ["pnpm add --save-dev @types/node eslint eslint-config-upleveled prettier typescript"]
        );
        assert_eq!(manifest_json(&ws)["type"], "module");
        assert_eq!(ws.read(GITIGNORE_FILE), ".eslintcache\n*.tsbuildinfo\n");
        assert!(ws.read(WORKSPACE_FILE).contains("strictDepBuilds: true"));
        assert!(ws.read("eslint.config.js").starts_with("// node-js"));
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let ws = Workspace::new(
            &ProjectFixture::next_js()
                .file(GITIGNORE_FILE, "node_modules\n")
                .file("jsconfig.json", "{\n  \"compilerOptions\": {\n    \"paths\": {\n      \"@/*\": [\"./*\"]\n    }\n  }\n}\n"),
        );
        let mut opts = options(&ws);
        opts.no_install = true;

        let first = install(&opts, &MockRunner::new(), &Shell::quiet()).unwrap();
        assert!(first.changed());
        assert!(first.jsconfig_removed);
        assert!(first.gitignore_updated);

        let manifest = ws.read(MANIFEST_FILE);
        let gitignore = ws.read(GITIGNORE_FILE);
        let workspace = ws.read(WORKSPACE_FILE);

        let second = install(&opts, &MockRunner::new(), &Shell::quiet()).unwrap();
        assert!(!second.changed());
        assert!(!second.manifest_updated);
        assert!(!second.gitignore_updated);
        assert!(!second.workspace_updated);
        assert!(!second.jsconfig_removed);
        let copied = second.templates.unwrap();
        assert!(copied.copied.is_empty());
        assert!(copied.overwritten.is_empty());
        assert_eq!(copied.unchanged, ["tsconfig.json"]);

        assert_eq!(ws.read(MANIFEST_FILE), manifest);
        assert_eq!(ws.read(GITIGNORE_FILE), gitignore);
        assert_eq!(ws.read(WORKSPACE_FILE), workspace);
    }

    #[test]
    fn test_next_project_gets_stylelint() {
        let ws = Workspace::new(&ProjectFixture::next_js().dev_dependency("eslint", "^9.0.0"));
        let runner = MockRunner::new();

        let report = install(&options(&ws), &runner, &Shell::quiet()).unwrap();

        assert_eq!(report.archetype, Archetype::NextJs);
        assert!(!report.plan.dev_dependencies.contains(&"eslint".to_string()));
        assert!(report.plan.dev_dependencies.contains(&"stylelint".to_string()));
        assert!(ws.project().join("stylelint.config.cjs").exists());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_database_env_read_from_dotenv() {
        let ws = Workspace::new(
            &ProjectFixture::next_js()
                .dependency("postgres", "^3.4.0")
                .file(
                    ".env",
                    "PGHOST=localhost\nPGUSERNAME=app\nPGPASSWORD=secret\nPGDATABASE=app\n",
                ),
        );
        let runner = MockRunner::new();

        let report = install(&options(&ws), &runner, &Shell::quiet()).unwrap();

        assert_eq!(report.archetype, Archetype::NextJsPostgresql);
        for package in ["@ts-safeql/eslint-plugin", "libpg-query"] {
            assert!(report.plan.dev_dependencies.contains(&package.to_string()));
        }
        assert!(runner.was_called("pnpm add --save-dev"));
        assert!(runner.calls()[0].contains(" libpg-query"));
    }

    #[test]
    fn test_create_react_app_records_pin_before_install() {
        let ws = Workspace::new(
            &ProjectFixture::new().dependency("@upleveled/react-scripts", "^5.0.0"),
        );
        let project = ws.project();
        let runner = MockRunner::new().effect("pnpm add", move || {
            let manifest: Value =
                serde_json::from_str(&fs::read_to_string(project.join(MANIFEST_FILE))?)?;
            anyhow::ensure!(
                manifest["pnpm"]["overrides"]["eslint-plugin-react"] == "7.23.2",
                "pin missing at install time"
            );
            Ok(())
        });

        let report = install(&options(&ws), &runner, &Shell::quiet()).unwrap();

        assert_eq!(report.archetype, Archetype::CreateReactApp);
        assert!(report.installed);
    }

    #[test]
    fn test_yarn_skips_workspace_settings() {
        let ws = Workspace::new(&ProjectFixture::new());
        let mut opts = options(&ws);
        opts.package_manager = Some(PackageManager::Yarn);
        let runner = MockRunner::new();

        let report = install(&opts, &runner, &Shell::quiet()).unwrap();

        assert!(!report.workspace_updated);
        assert!(!ws.project().join(WORKSPACE_FILE).exists());
        assert!(runner.was_called("yarn add --dev"));
    }

    #[test]
    fn test_install_failure_stops_pipeline() {
        let ws = Workspace::new(&ProjectFixture::new());
        let runner = MockRunner::new().fail("pnpm add");

        assert!(install(&options(&ws), &runner, &Shell::quiet()).is_err());
        assert!(!ws.project().join("eslint.config.js").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let ws = Workspace::new(&ProjectFixture::new());
        let before = ws.read(MANIFEST_FILE);
        let mut opts = options(&ws);
        opts.dry_run = true;
        let runner = MockRunner::new();

        let report = install(&opts, &runner, &Shell::quiet()).unwrap();

        assert_eq!(report.plan.dev_dependencies.len(), 5);
        assert!(!report.changed());
        assert!(runner.calls().is_empty());
        assert_eq!(ws.read(MANIFEST_FILE), before);
        assert!(!ws.project().join(GITIGNORE_FILE).exists());
    }

    #[test]
    fn test_archetype_override() {
        let ws = Workspace::new(&ProjectFixture::new());
        let mut opts = options(&ws);
        opts.archetype = Some(Archetype::Expo);
        opts.no_install = true;

        let report = install(&opts, &MockRunner::new(), &Shell::quiet()).unwrap();

        assert_eq!(report.archetype, Archetype::Expo);
        assert!(ws.read("eslint.config.js").starts_with("// expo"));
    }

    #[test]
    fn test_missing_manifest() {
        let ws = Workspace::new(&ProjectFixture::new());
        fs::remove_file(ws.project().join(MANIFEST_FILE)).unwrap();

        let err = install(&options(&ws), &MockRunner::new(), &Shell::quiet()).unwrap_err();
        assert!(format!("{:#}", err).contains("package.json"));
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let ws = Workspace::new(&ProjectFixture::new());
        let nested = ws.project().join("src").join("app");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested).unwrap(), ws.project());
    }
}
