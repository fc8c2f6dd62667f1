//! Test utilities for lintpack unit tests.
//!
//! [`MockRunner`] stands in for the package manager: it records every
//! command, returns canned stdout, and can run a side effect (for example
//! creating the files `pnpm patch` would extract).
//!
//! ```rust,ignore
//! let runner = MockRunner::new()
//!     .respond("pnpm list next --json", r#"[{"dependencies": {}}]"#)
//!     .fail("pnpm install");
//! ```

pub mod fixtures;

use std::cell::RefCell;

use anyhow::{bail, Result};

use crate::util::process::{CommandRunner, ProcessBuilder};

pub use fixtures::*;

type Effect = Box<dyn Fn() -> Result<()>>;

/// What a matched command does.
struct CommandExpectation {
    /// Matches commands whose display form starts with this.
    prefix: String,
    stdout: String,
    effect: Option<Effect>,
    fail: bool,
}

/// Mock [`CommandRunner`].
///
/// Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct MockRunner {
    expectations: Vec<CommandExpectation>,
    calls: RefCell<Vec<String>>,
}

impl MockRunner {
    /// Create a runner where every command succeeds silently.
    pub fn new() -> Self {
        MockRunner::default()
    }

    fn expectation(prefix: &str) -> CommandExpectation {
        CommandExpectation {
            prefix: prefix.to_string(),
            stdout: String::new(),
            effect: None,
            fail: false,
        }
    }

    /// Return `stdout` for commands starting with `prefix`.
    pub fn respond(mut self, prefix: &str, stdout: &str) -> Self {
        let mut exp = Self::expectation(prefix);
        exp.stdout = stdout.to_string();
        self.expectations.push(exp);
        self
    }

    /// Run `effect` for commands starting with `prefix`.
    pub fn effect(mut self, prefix: &str, effect: impl Fn() -> Result<()> + 'static) -> Self {
        let mut exp = Self::expectation(prefix);
        exp.effect = Some(Box::new(effect));
        self.expectations.push(exp);
        self
    }

    /// Exit non-zero for commands starting with `prefix`.
    pub fn fail(mut self, prefix: &str) -> Self {
        let mut exp = Self::expectation(prefix);
        exp.fail = true;
        self.expectations.push(exp);
        self
    }

    /// Commands run so far, in display form.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Whether any recorded command starts with `prefix`.
    pub fn was_called(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|call| call.starts_with(prefix))
    }

    fn dispatch(&self, cmd: &ProcessBuilder) -> Result<String> {
        let display = cmd.display_command();
        self.calls.borrow_mut().push(display.clone());

        let Some(exp) = self
            .expectations
            .iter()
            .find(|exp| display.starts_with(&exp.prefix))
        else {
            return Ok(String::new());
        };

        if let Some(effect) = &exp.effect {
            effect()?;
        }
        if exp.fail {
            bail!("`{}` failed with exit code Some(1)", display);
        }
        Ok(exp.stdout.clone())
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        self.dispatch(cmd).map(|_| ())
    }

    fn output(&self, cmd: &ProcessBuilder) -> Result<String> {
        self.dispatch(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_records_and_responds() {
        let runner = MockRunner::new()
            .respond("pnpm list", "[]")
            .fail("pnpm install");

        let out = runner
            .output(&ProcessBuilder::new("pnpm").args(["list", "next", "--json"]))
            .unwrap();
        assert_eq!(out, "[]");
        assert!(runner.run(&ProcessBuilder::new("pnpm").arg("install")).is_err());
        assert!(runner
            .run(&ProcessBuilder::new("pnpm").arg("patch-commit"))
            .is_ok());

        assert_eq!(
            runner.calls(),
            ["pnpm list next --json", "pnpm install", "pnpm patch-commit"]
        );
    }
}
