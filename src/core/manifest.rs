//! `package.json` manifest handling.
//!
//! The manifest belongs to the consumer project. lintpack only ever adds to
//! it: the module type, resolution pins, and (through the package manager)
//! dev dependencies. Every write goes through [`PackageManifest::save`],
//! which sorts the document the way `sort-package-json` does and ends the
//! file with exactly one newline.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::package_manager::PackageManager;
use crate::util::fs;

/// File name of the manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// Package name to version requirement.
pub type DependencyMap = BTreeMap<String, String>;

/// Manifest shape errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("package.json contains non-object")]
    NotAnObject,

    #[error("`{field}` in package.json is not an object")]
    NotAnObjectField { field: String },
}

/// Well-known top-level keys, in the order `sort-package-json` emits them.
const KEY_ORDER: &[&str] = &[
    "$schema",
    "name",
    "displayName",
    "version",
    "private",
    "description",
    "categories",
    "keywords",
    "homepage",
    "bugs",
    "repository",
    "funding",
    "license",
    "author",
    "maintainers",
    "contributors",
    "publisher",
    "sideEffects",
    "type",
    "imports",
    "exports",
    "main",
    "module",
    "source",
    "browser",
    "react-native",
    "types",
    "typesVersions",
    "typings",
    "style",
    "bin",
    "man",
    "directories",
    "files",
    "workspaces",
    "scripts",
    "husky",
    "simple-git-hooks",
    "lint-staged",
    "config",
    "babel",
    "browserslist",
    "prettier",
    "eslintConfig",
    "stylelint",
    "jest",
    "resolutions",
    "dependencies",
    "devDependencies",
    "dependenciesMeta",
    "peerDependencies",
    "peerDependenciesMeta",
    "optionalDependencies",
    "bundledDependencies",
    "bundleDependencies",
    "overrides",
    "packageManager",
    "engines",
    "volta",
    "os",
    "cpu",
    "publishConfig",
    "pnpm",
];

/// Top-level objects whose keys are sorted alphabetically.
const SORTED_OBJECTS: &[&str] = &[
    "resolutions",
    "dependencies",
    "devDependencies",
    "dependenciesMeta",
    "peerDependencies",
    "peerDependenciesMeta",
    "optionalDependencies",
    "overrides",
    "engines",
];

/// Objects under `pnpm` whose keys are sorted alphabetically.
const SORTED_PNPM_OBJECTS: &[&str] = &["overrides", "patchedDependencies", "peerDependencyRules"];

/// A parsed `package.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    root: Map<String, Value>,
}

impl PackageManifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        match value {
            Value::Object(root) => Ok(PackageManifest { root }),
            _ => Err(ManifestError::NotAnObject.into()),
        }
    }

    /// Write the sorted manifest to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write_string(path, &self.to_json_string()?)
    }

    /// Serialize with sorted keys, 2-space indentation and a trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let sorted = Value::Object(self.sorted().root);
        let mut out =
            serde_json::to_string_pretty(&sorted).context("failed to serialize package.json")?;
        out.push('\n');
        Ok(out)
    }

    /// Return a copy with keys in `sort-package-json` order.
    pub fn sorted(&self) -> PackageManifest {
        let mut known: Vec<(&String, &Value)> = Vec::new();
        let mut unknown: Vec<(&String, &Value)> = Vec::new();
        for (key, value) in &self.root {
            if KEY_ORDER.contains(&key.as_str()) {
                known.push((key, value));
            } else {
                unknown.push((key, value));
            }
        }
        known.sort_by_key(|(key, _)| KEY_ORDER.iter().position(|k| k == key));
        unknown.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut root = Map::new();
        for (key, value) in known.into_iter().chain(unknown) {
            let value = if SORTED_OBJECTS.contains(&key.as_str()) {
                sort_object_keys(value)
            } else if key == "pnpm" {
                sort_pnpm_section(value)
            } else {
                value.clone()
            };
            root.insert(key.clone(), value);
        }

        PackageManifest { root }
    }

    /// Runtime dependencies.
    pub fn dependencies(&self) -> DependencyMap {
        self.dependency_map("dependencies")
    }

    /// Development dependencies.
    pub fn dev_dependencies(&self) -> DependencyMap {
        self.dependency_map("devDependencies")
    }

    fn dependency_map(&self, field: &str) -> DependencyMap {
        match self.root.get(field) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(name, version)| {
                    version.as_str().map(|v| (name.clone(), v.to_string()))
                })
                .collect(),
            _ => DependencyMap::new(),
        }
    }

    /// The `packageManager` field, e.g. `pnpm@9.12.0`.
    pub fn package_manager_field(&self) -> Option<&str> {
        self.root.get("packageManager").and_then(Value::as_str)
    }

    /// The `type` field.
    pub fn module_type(&self) -> Option<&str> {
        self.root.get("type").and_then(Value::as_str)
    }

    /// Set `"type": "module"`. Returns whether the manifest changed.
    ///
    /// ESLint only loads `eslint.config.js` as ESM when the package is a
    /// module package.
    pub fn set_module_type(&mut self) -> bool {
        if self.module_type() == Some("module") {
            return false;
        }
        self.root
            .insert("type".to_string(), Value::String("module".to_string()));
        true
    }

    /// Record resolution pins for `manager`.
    ///
    /// Missing pins are added and differing ones upgraded; nothing is
    /// removed. Returns the names of the packages whose pin changed.
    pub fn pin_overrides(
        &mut self,
        manager: PackageManager,
        pins: &BTreeMap<String, String>,
    ) -> Result<Vec<String>, ManifestError> {
        if pins.is_empty() {
            return Ok(Vec::new());
        }

        let path = manager.overrides_path();
        let overrides = object_at_path(&mut self.root, path)?;

        let mut changed = Vec::new();
        for (package, version) in pins {
            if overrides.get(package).and_then(Value::as_str) == Some(version.as_str()) {
                continue;
            }
            overrides.insert(package.clone(), Value::String(version.clone()));
            changed.push(package.clone());
        }
        Ok(changed)
    }

    /// Current resolution pins for `manager`.
    pub fn overrides(&self, manager: PackageManager) -> DependencyMap {
        let mut current = &self.root;
        for key in manager.overrides_path() {
            match current.get(*key) {
                Some(Value::Object(map)) => current = map,
                _ => return DependencyMap::new(),
            }
        }
        current
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    }

    /// Drop `pnpm.patchedDependencies` entries whose key starts with
    /// `prefix`. Returns the number of entries removed.
    pub fn remove_patched_dependencies(&mut self, prefix: &str) -> usize {
        let Some(Value::Object(patched)) = self
            .root
            .get_mut("pnpm")
            .and_then(Value::as_object_mut)
            .and_then(|pnpm| pnpm.get_mut("patchedDependencies"))
        else {
            return 0;
        };

        let before = patched.len();
        patched.retain(|name, _| !name.starts_with(prefix));
        before - patched.len()
    }

    /// Keys of `pnpm.patchedDependencies`.
    pub fn patched_dependencies(&self) -> Vec<String> {
        self.root
            .get("pnpm")
            .and_then(|pnpm| pnpm.get("patchedDependencies"))
            .and_then(Value::as_object)
            .map(|patched| patched.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Raw access to a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }
}

/// Walk (creating as needed) nested objects along `path`.
fn object_at_path<'a>(
    root: &'a mut Map<String, Value>,
    path: &[&str],
) -> Result<&'a mut Map<String, Value>, ManifestError> {
    let mut current = root;
    let mut walked = Vec::new();
    for key in path {
        walked.push(*key);
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry
            .as_object_mut()
            .ok_or_else(|| ManifestError::NotAnObjectField {
                field: walked.join("."),
            })?;
    }
    Ok(current)
}

fn sort_object_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

fn sort_pnpm_section(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if SORTED_PNPM_OBJECTS.contains(&k.as_str()) {
                        sort_object_keys(v)
                    } else {
                        v.clone()
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
