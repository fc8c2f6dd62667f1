//! lintpack - installs a shared lint and format configuration into
//! JavaScript projects
//!
//! This crate provides the core library functionality for lintpack:
//! project classification, `package.json` editing, template copying and
//! reconciliation of ignore and workspace files.

pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for lintpack unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock command runner and project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{archetype::Archetype, manifest::PackageManifest, package_manager::PackageManager};
pub use util::shell::Shell;
