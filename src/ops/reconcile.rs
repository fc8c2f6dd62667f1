//! Append-only reconciliation of ignore and workspace settings files.
//!
//! A missing file is the same as an empty one. Existing lines are never
//! removed or reordered, and a file is only rewritten when something was
//! appended.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::archetype::Archetype;
use crate::util::fs::{read_optional, write_string};

/// Ignore patterns every project needs.
pub const REQUIRED_IGNORE_PATTERNS: &[&str] = &[".eslintcache", "*.tsbuildinfo"];

/// A block of settings identified by its top-level YAML key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsBlock {
    pub key: &'static str,
    pub text: &'static str,
}

/// Settings appended to `pnpm-workspace.yaml`.
pub const WORKSPACE_SETTINGS: &[SettingsBlock] = &[
    SettingsBlock {
        key: "minimumReleaseAge",
        text: "# Prevents installation of packages newer than 7 days
# to mitigate supply chain security risks
# - https://pnpm.io/settings#minimumreleaseage
minimumReleaseAge: 10080
minimumReleaseAgeExclude:
  - '@upleveled/*'
  - eslint-config-upleveled
  - stylelint-config-upleveled",
    },
    SettingsBlock {
        key: "strictDepBuilds",
        text: "# Fail on pnpm ignored build scripts
# - https://pnpm.io/settings#strictdepbuilds
strictDepBuilds: true",
    },
];

/// The `jsconfig.json` that `create-next-app` generates.
const DEFAULT_NEXT_JSCONFIG: &str = r#"{
  "compilerOptions": {
    "paths": {
      "@/*": ["./*"]
    }
  }
}"#;

pub const GITIGNORE_FILE: &str = ".gitignore";
pub const WORKSPACE_FILE: &str = "pnpm-workspace.yaml";
pub const JSCONFIG_FILE: &str = "jsconfig.json";

/// The line ending of the first line: `\r\n` or `\n`.
fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(end) if content[..end].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Lines of a file being appended to.
///
/// Existing lines are kept verbatim, including a trailing `\r`. Appended
/// lines use the file's line ending.
struct LineBuffer {
    lines: Vec<String>,
    crlf: bool,
}

impl LineBuffer {
    /// Split into lines, dropping the empty tail left by trailing newlines.
    fn parse(content: &str) -> LineBuffer {
        let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        LineBuffer {
            lines,
            crlf: line_ending(content) == "\r\n",
        }
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn contains_line(&self, pattern: &str) -> bool {
        self.lines.iter().any(|line| line.trim_end() == pattern)
    }

    fn has_key(&self, prefix: &str) -> bool {
        self.lines.iter().any(|line| line.starts_with(prefix))
    }

    /// In CRLF mode, give the current last line its `\r`.
    fn terminate_last(&mut self) {
        if !self.crlf {
            return;
        }
        if let Some(last) = self.lines.last_mut() {
            if !last.ends_with('\r') {
                last.push('\r');
            }
        }
    }

    fn push(&mut self, line: &str) {
        self.terminate_last();
        self.lines.push(line.to_string());
    }

    /// The file content, ending with exactly one line ending.
    fn finish(mut self) -> String {
        self.terminate_last();
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Append each `required` line not already present.
///
/// Returns the new content, or `None` when nothing was missing. The result
/// ends with exactly one newline.
pub fn append_missing_lines(content: &str, required: &[&str]) -> Option<String> {
    let mut buffer = LineBuffer::parse(content);
    let mut changed = false;

    for pattern in required {
        if buffer.contains_line(pattern) {
            continue;
        }
        buffer.push(pattern);
        changed = true;
    }

    changed.then(|| buffer.finish())
}

/// Append each settings block whose key is not yet set.
///
/// Blocks are separated from existing content by a blank line.
pub fn append_missing_blocks(content: &str, blocks: &[SettingsBlock]) -> Option<String> {
    let mut buffer = LineBuffer::parse(content);
    let mut changed = false;

    for block in blocks {
        if buffer.has_key(&format!("{}:", block.key)) {
            continue;
        }
        if !buffer.is_empty() {
            buffer.push("");
        }
        for line in block.text.lines() {
            buffer.push(line);
        }
        changed = true;
    }

    changed.then(|| buffer.finish())
}

/// Ensure `.gitignore` lists the required patterns plus `extra`.
///
/// Returns whether the file was written.
pub fn reconcile_gitignore(project_root: &Path, extra: &[String]) -> Result<bool> {
    let path = project_root.join(GITIGNORE_FILE);
    let content = read_optional(&path)?.unwrap_or_default();

    let mut required: Vec<&str> = REQUIRED_IGNORE_PATTERNS.to_vec();
    required.extend(extra.iter().map(String::as_str));

    match append_missing_lines(&content, &required) {
        Some(updated) => {
            write_string(&path, &updated)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Ensure `pnpm-workspace.yaml` carries the supply-chain settings.
///
/// Returns whether the file was written.
pub fn reconcile_workspace_settings(project_root: &Path) -> Result<bool> {
    let path = project_root.join(WORKSPACE_FILE);
    let content = read_optional(&path)?.unwrap_or_default();

    match append_missing_blocks(&content, WORKSPACE_SETTINGS) {
        Some(updated) => {
            write_string(&path, &updated)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Remove the `jsconfig.json` generated by `create-next-app`.
///
/// Only Next.js projects are touched, and only when the file is exactly the
/// generated default; `tsconfig.json` from the templates replaces it.
pub fn remove_default_jsconfig(project_root: &Path, archetype: Archetype) -> Result<bool> {
    if !archetype.is_next() {
        return Ok(false);
    }

    let path = project_root.join(JSCONFIG_FILE);
    let Some(content) = read_optional(&path)? else {
        return Ok(false);
    };

    if content.trim() != DEFAULT_NEXT_JSCONFIG {
        tracing::debug!("keeping customized {}", JSCONFIG_FILE);
        return Ok(false);
    }

    std::fs::remove_file(&path)
        .with_context(|| format!("failed to remove {}", path.display()))?;
    Ok(true)
}
