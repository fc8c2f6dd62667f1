//! High-level operations.
//!
//! This module contains the implementation of lintpack commands.

pub mod expo;
pub mod lintpack_install;
pub mod patch;
pub mod plan;
pub mod reconcile;
pub mod templates;

pub use expo::{expo_setup, ExpoError};
pub use lintpack_install::{find_project_root, install, InstallOptions, InstallReport};
pub use patch::{run_patch_stage, PatchContext, PatchError};
pub use plan::InstallPlan;
pub use reconcile::{reconcile_gitignore, reconcile_workspace_settings, remove_default_jsconfig};
pub use templates::{copy_templates, resolve_template_root, CopyReport};
