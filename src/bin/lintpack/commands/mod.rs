//! Command implementations

pub mod completions;
pub mod expo;
pub mod install;
