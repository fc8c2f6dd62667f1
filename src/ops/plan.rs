//! Computing which tool dependencies a project still needs.
//!
//! This is a pure function of the archetype, the capability flags, the
//! current manifest and the configuration; nothing here touches the disk.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::archetype::Archetype;
use crate::core::capabilities::Capabilities;
use crate::core::manifest::PackageManifest;
use crate::core::package_manager::PackageManager;
use crate::util::config::Config;
use crate::util::process::ProcessBuilder;

/// Installed for every archetype.
///
/// `eslint-config-upleveled` is the shared config every template's
/// `eslint.config.js` re-exports. `eslint` and `typescript` are installed at
/// the top level so their bins are hoisted and peer dependency resolution
/// sees a single copy. `prettier` is pinned locally so editors do not fall
/// back to a bundled older version.
pub const BASELINE_DEV_DEPENDENCIES: &[&str] = &[
    "@types/node",
    "eslint",
    "eslint-config-upleveled",
    "prettier",
    "typescript",
];

/// SQL linting against the development database.
pub const SAFEQL_DEV_DEPENDENCIES: &[&str] = &["@ts-safeql/eslint-plugin", "libpg-query"];

/// Formatting of embedded SQL.
pub const SQL_FORMAT_DEV_DEPENDENCIES: &[&str] = &["prettier-plugin-embed", "prettier-plugin-sql"];

/// React DOM projects also lint CSS.
pub const REACT_DOM_DEV_DEPENDENCIES: &[&str] = &[
    "@types/react",
    "@types/react-dom",
    "stylelint",
    "stylelint-config-upleveled",
];

/// Resolution pins that keep a single copy of a plugin in the tree.
pub fn override_pins(archetype: Archetype) -> BTreeMap<String, String> {
    match archetype {
        // react-scripts bundles an older eslint-plugin-react that clashes
        // with the one the shared config loads.
        Archetype::CreateReactApp => {
            [("eslint-plugin-react".to_string(), "7.23.2".to_string())].into()
        }
        _ => BTreeMap::new(),
    }
}

/// The dependency changes for one installer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub archetype: Archetype,
    /// Dev dependencies to add, in install order.
    pub dev_dependencies: Vec<String>,
    /// Resolution pins to record before installing.
    pub overrides: BTreeMap<String, String>,
}

impl InstallPlan {
    /// Work out the dev dependencies still missing from `manifest`.
    pub fn build(
        archetype: Archetype,
        capabilities: &Capabilities,
        manifest: &PackageManifest,
        config: &Config,
    ) -> InstallPlan {
        let mut wanted: Vec<String> = required_dev_dependencies(archetype, capabilities)
            .into_iter()
            .map(str::to_string)
            .collect();
        wanted.extend(config.install.extra_dev_dependencies.iter().cloned());

        let present = manifest.dev_dependencies();
        let mut dev_dependencies = Vec::new();
        for name in wanted {
            if present.contains_key(&name) || dev_dependencies.contains(&name) {
                continue;
            }
            dev_dependencies.push(name);
        }

        InstallPlan {
            archetype,
            dev_dependencies,
            overrides: override_pins(archetype),
        }
    }

    /// Whether nothing needs to be added.
    pub fn is_empty(&self) -> bool {
        self.dev_dependencies.is_empty()
    }

    /// The package manager invocation for this plan.
    pub fn command(&self, manager: PackageManager, project_root: &Path) -> ProcessBuilder {
        manager.install_command(project_root, &self.dev_dependencies)
    }

    /// "1 dependency" / "3 dependencies".
    pub fn describe_count(&self) -> String {
        match self.dev_dependencies.len() {
            1 => "1 dependency".to_string(),
            n => format!("{} dependencies", n),
        }
    }
}

/// Everything the archetype needs, before subtracting what is installed.
pub fn required_dev_dependencies(
    archetype: Archetype,
    capabilities: &Capabilities,
) -> Vec<&'static str> {
    let mut deps = BASELINE_DEV_DEPENDENCIES.to_vec();

    if archetype.has_database() {
        if capabilities.safeql_enabled() {
            deps.extend_from_slice(SAFEQL_DEV_DEPENDENCIES);
        }
        deps.extend_from_slice(SQL_FORMAT_DEV_DEPENDENCIES);
    }

    if archetype.uses_react_dom() {
        deps.extend_from_slice(REACT_DOM_DEV_DEPENDENCIES);
    }

    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capabilities::Platform;
    use std::collections::HashMap;

    fn caps(archetype: Archetype, env: &[(&str, &str)]) -> Capabilities {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Capabilities::resolve(archetype, PackageManager::Pnpm, false, &env, Platform::Linux)
    }

    fn manifest(json: &str) -> PackageManifest {
        PackageManifest::parse(json).unwrap()
    }

    #[test]
    fn test_generic_project_gets_baseline() {
        let plan = InstallPlan::build(
            Archetype::NodeJs,
            &caps(Archetype::NodeJs, &[]),
            &manifest("{}"),
            &Config::default(),
        );
        assert_eq!(
            plan.dev_dependencies,
            [
                "@types/node",
                "eslint",
                "eslint-config-upleveled",
                "prettier",
                "typescript"
            ]
        );
        assert!(plan.overrides.is_empty());
    }

    #[test]
    fn test_existing_dev_dependencies_are_subtracted() {
        let plan = InstallPlan::build(
            Archetype::NodeJs,
            &caps(Archetype::NodeJs, &[]),
            &manifest(r#"{"devDependencies": {"eslint": "^9.0.0", "typescript": "^5.0.0"}}"#),
            &Config::default(),
        );
        assert_eq!(
            plan.dev_dependencies,
            ["@types/node", "eslint-config-upleveled", "prettier"]
        );
        assert_eq!(plan.describe_count(), "3 dependencies");
    }

    #[test]
    fn test_everything_installed_yields_empty_plan() {
        let plan = InstallPlan::build(
            Archetype::NodeJs,
            &caps(Archetype::NodeJs, &[]),
            &manifest(
                r#"{"devDependencies": {"@types/node": "1", "eslint": "1", "eslint-config-upleveled": "1", "prettier": "1", "typescript": "1"}}"#,
            ),
            &Config::default(),
        );
        assert!(plan.is_empty());
        let cmd = plan.command(PackageManager::Pnpm, Path::new("."));
        assert_eq!(cmd.get_args(), ["install"]);
    }

    #[test]
    fn test_next_postgres_with_database_env() {
        let env = [
            ("PGHOST", "localhost"),
            ("PGUSERNAME", "u"),
            ("PGPASSWORD", "p"),
            ("PGDATABASE", "d"),
        ];
        let deps = required_dev_dependencies(
            Archetype::NextJsPostgresql,
            &caps(Archetype::NextJsPostgresql, &env),
        );
        assert!(deps.contains(&"@ts-safeql/eslint-plugin"));
        assert!(deps.contains(&"libpg-query"));
        assert!(deps.contains(&"prettier-plugin-sql"));
        assert!(deps.contains(&"stylelint"));
    }

    #[test]
    fn test_safeql_skipped_without_database_env() {
        let deps = required_dev_dependencies(
            Archetype::ExpoPostgresql,
            &caps(Archetype::ExpoPostgresql, &[]),
        );
        assert!(!deps.contains(&"@ts-safeql/eslint-plugin"));
        assert!(deps.contains(&"prettier-plugin-embed"));
        assert!(!deps.contains(&"stylelint"));
    }

    #[test]
    fn test_extra_dependencies_from_config_are_deduplicated() {
        let mut config = Config::default();
        config.install.extra_dev_dependencies =
            vec!["eslint".to_string(), "eslint-plugin-storybook".to_string()];

        let plan = InstallPlan::build(
            Archetype::NodeJs,
            &caps(Archetype::NodeJs, &[]),
            &manifest("{}"),
            &config,
        );
        assert_eq!(plan.dev_dependencies.len(), 6);
        assert_eq!(
            plan.dev_dependencies.last().map(String::as_str),
            Some("eslint-plugin-storybook")
        );
        assert_eq!(plan.describe_count(), "6 dependencies");
    }

    #[test]
    fn test_create_react_app_pins_plugin() {
        let pins = override_pins(Archetype::CreateReactApp);
        assert_eq!(pins["eslint-plugin-react"], "7.23.2");
    }
}
