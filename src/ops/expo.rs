//! Implementation of `lintpack expo-setup`.
//!
//! Converts a fresh `create-expo-app` project to a TypeScript app config and
//! enables the fast Metro resolver for local and EAS builds.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::util::fs::{read_optional, write_string};
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::Shell;

pub const APP_JSON: &str = "app.json";
pub const APP_CONFIG: &str = "app.config.ts";
pub const EAS_JSON: &str = "eas.json";
pub const IMAGES_DTS: &str = "images.d.ts";

const ENV_FILES: [&str; 2] = [".env.development", ".env.production"];
const FAST_RESOLVER_ENV: &str = "EXPO_USE_FAST_RESOLVER=1\n";
const EAS_PROFILES: [&str; 3] = ["development", "preview", "production"];

const IMAGE_EXTENSIONS: [&str; 9] = [
    "png", "jpg", "jpeg", "webp", "avif", "gif", "ico", "bmp", "svg",
];

/// Malformed Expo project files.
#[derive(Debug, Error)]
pub enum ExpoError {
    #[error("{file} not found; run this in an Expo project root")]
    NotFound { file: &'static str },

    #[error("{file} is not valid JSON")]
    InvalidJson {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("app.json either contains non-object or contains object without .expo property")]
    MissingExpoConfig,

    #[error("eas.json is missing the `{path}` object")]
    MissingBuildProfile { path: String },
}

/// The parsed inputs, validated before anything is written.
struct ExpoProject {
    expo: Value,
    eas: Map<String, Value>,
}

fn read_json(root: &Path, file: &'static str) -> Result<Value> {
    let content = read_optional(&root.join(file))?.ok_or(ExpoError::NotFound { file })?;
    let value = serde_json::from_str(&content)
        .map_err(|source| ExpoError::InvalidJson { file, source })?;
    Ok(value)
}

fn load(root: &Path) -> Result<ExpoProject> {
    let expo = match read_json(root, APP_JSON)? {
        Value::Object(mut app) => match app.remove("expo") {
            Some(expo @ Value::Object(_)) => expo,
            _ => return Err(ExpoError::MissingExpoConfig.into()),
        },
        _ => return Err(ExpoError::MissingExpoConfig.into()),
    };

    let Value::Object(eas) = read_json(root, EAS_JSON)? else {
        return Err(ExpoError::MissingBuildProfile {
            path: "build".to_string(),
        }
        .into());
    };
    let build = eas.get("build").and_then(Value::as_object).ok_or_else(|| {
        ExpoError::MissingBuildProfile {
            path: "build".to_string(),
        }
    })?;
    for profile in EAS_PROFILES {
        if !build.get(profile).is_some_and(Value::is_object) {
            return Err(ExpoError::MissingBuildProfile {
                path: format!("build.{}", profile),
            }
            .into());
        }
    }

    Ok(ExpoProject { expo, eas })
}

/// Render `app.config.ts` from the `expo` object of `app.json`.
pub fn render_app_config(expo: &Value) -> Result<String> {
    let body = serde_json::to_string_pretty(expo)?;
    Ok(format!(
        "import {{ ExpoConfig }} from \"expo/config\";\n\nconst config: ExpoConfig = {};\n\nexport default config;\n",
        body
    ))
}

/// Make every build profile extend a `base` profile that enables the fast
/// resolver.
pub fn extend_build_profiles(eas: &mut Map<String, Value>) {
    let Some(Value::Object(build)) = eas.get_mut("build") else {
        return;
    };

    build.insert(
        "base".to_string(),
        json!({
            "env": {
                "NODE_ENV": "production",
                "EXPO_USE_FAST_RESOLVER": "1",
            }
        }),
    );

    for profile in EAS_PROFILES {
        if let Some(Value::Object(settings)) = build.get_mut(profile) {
            settings.insert("extends".to_string(), json!("base"));
            if profile == "development" {
                settings.insert("env".to_string(), json!({ "NODE_ENV": "development" }));
            }
        }
    }
}

/// Module declarations for static image imports.
pub fn images_dts() -> String {
    let mut out = String::from("// Image types inspired by Next.js `global.d.ts`\n");
    for (i, ext) in IMAGE_EXTENSIONS.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "declare module '*.{}' {{\n  const path: string;\n  export default path;\n}}\n",
            ext
        ));
    }
    out
}

/// Run the Expo setup in `root`.
pub fn expo_setup(root: &Path, runner: &dyn CommandRunner, shell: &Shell) -> Result<()> {
    let ExpoProject { expo, mut eas } = load(root)?;

    write_string(&root.join(APP_CONFIG), &render_app_config(&expo)?)?;
    shell.done(format!("Converted {} to {}", APP_JSON, APP_CONFIG));

    let prettier = ProcessBuilder::new("npx")
        .args(["prettier", "--write", APP_CONFIG])
        .cwd(root);
    match runner.run(&prettier) {
        Ok(()) => shell.done(format!("Formatted {} with Prettier", APP_CONFIG)),
        Err(e) => {
            tracing::debug!("{:#}", e);
            shell.warn(format!("could not format {} with Prettier", APP_CONFIG));
        }
    }

    let app_json = root.join(APP_JSON);
    fs::remove_file(&app_json)
        .with_context(|| format!("failed to remove {}", app_json.display()))?;
    shell.done(format!("Deleted {}", APP_JSON));

    for file in ENV_FILES {
        write_string(&root.join(file), FAST_RESOLVER_ENV)?;
        shell.done(format!("Enabled new Metro resolver in {}", file));
    }

    extend_build_profiles(&mut eas);
    let mut eas_json = serde_json::to_string_pretty(&Value::Object(eas))?;
    eas_json.push('\n');
    write_string(&root.join(EAS_JSON), &eas_json)?;
    shell.done(format!("Enabled new Metro resolver in {}", EAS_JSON));

    write_string(&root.join(IMAGES_DTS), &images_dts())?;
    shell.done(format!("Created {}", IMAGES_DTS));

    Ok(())
}
