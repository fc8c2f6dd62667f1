//! Test fixtures for common test scenarios.
//!
//! Builders for JavaScript projects and template directories laid out on
//! disk inside a [`TempDir`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use crate::core::archetype::Archetype;

/// Fixture for a project directory.
#[derive(Debug, Clone, Default)]
pub struct ProjectFixture {
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    /// Extra files (path relative to project root -> content).
    pub files: BTreeMap<PathBuf, String>,
}

impl ProjectFixture {
    /// A project with no dependencies.
    pub fn new() -> Self {
        ProjectFixture::default()
    }

    /// A project `create-next-app` would produce.
    pub fn next_js() -> Self {
        ProjectFixture::new()
            .dependency("next", "13.1.6")
            .dependency("react", "18.2.0")
            .dependency("react-dom", "18.2.0")
    }

    /// Add a runtime dependency.
    pub fn dependency(mut self, name: &str, version: &str) -> Self {
        self.dependencies.insert(name.to_string(), version.to_string());
        self
    }

    /// Add a dev dependency.
    pub fn dev_dependency(mut self, name: &str, version: &str) -> Self {
        self.dev_dependencies
            .insert(name.to_string(), version.to_string());
        self
    }

    /// Add an arbitrary file.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// The `package.json` for this fixture.
    pub fn manifest(&self) -> String {
        let mut manifest = json!({
            "name": "fixture",
            "version": "0.1.0",
            "private": true,
        });
        if !self.dependencies.is_empty() {
            manifest["dependencies"] = json!(self.dependencies);
        }
        if !self.dev_dependencies.is_empty() {
            manifest["devDependencies"] = json!(self.dev_dependencies);
        }
        format!("{:#}\n", manifest)
    }

    /// Write the fixture into `root`.
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        fs::create_dir_all(root)?;
        fs::write(root.join("package.json"), self.manifest())?;
        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(full, content)?;
        }
        Ok(())
    }
}

/// A project plus a template root, both in one temporary directory.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Lay out `project` under `project/` and a template set for every
    /// archetype under `templates/`.
    pub fn new(project: &ProjectFixture) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        project
            .write_to(&dir.path().join("project"))
            .expect("failed to write project fixture");
        write_template_root(&dir.path().join("templates")).expect("failed to write templates");
        Workspace { dir }
    }

    pub fn project(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    pub fn templates(&self) -> PathBuf {
        self.dir.path().join("templates")
    }

    /// Read a project file, panicking if absent.
    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.project().join(path))
            .unwrap_or_else(|e| panic!("failed to read {}: {}", path, e))
    }
}

/// Write a minimal template set for each archetype.
pub fn write_template_root(root: &Path) -> std::io::Result<()> {
    for archetype in Archetype::ALL {
        let dir = root.join(archetype.tag());
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join("eslint.config.js"),
            format!("// {}\nexport {{ default }} from 'eslint-config-upleveled';\n", archetype.tag()),
        )?;
        fs::write(dir.join("tsconfig.json"), "{\n  \"extends\": \"@upleveled/tsconfig\"\n}\n")?;
        if archetype.has_database() {
            fs::write(dir.join("prettier.config.mjs"), "export default {};\n")?;
        }
        if archetype.uses_react_dom() {
            fs::write(
                dir.join("stylelint.config.cjs"),
                "module.exports = { extends: ['stylelint-config-upleveled'] };\n",
            )?;
        }
    }
    Ok(())
}
