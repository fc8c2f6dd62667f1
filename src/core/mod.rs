//! Core data structures for lintpack.
//!
//! This module contains the types the installer reasons about:
//! - Project archetypes and their detection rules
//! - The `package.json` document
//! - Package managers
//! - Host capabilities resolved at startup

pub mod archetype;
pub mod capabilities;
pub mod manifest;
pub mod package_manager;

pub use archetype::{classify, Archetype};
pub use capabilities::{Capabilities, PatchSupport, Platform, SafeqlSupport};
pub use manifest::{DependencyMap, PackageManifest, MANIFEST_FILE};
pub use package_manager::PackageManager;
