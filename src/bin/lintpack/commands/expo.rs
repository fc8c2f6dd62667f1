//! `lintpack expo-setup` command

use anyhow::{Context, Result};

use crate::cli::ExpoSetupArgs;
use lintpack::ops::expo_setup;
use lintpack::util::{ProcessRunner, Shell};

pub fn execute(args: ExpoSetupArgs, shell: &Shell) -> Result<()> {
    let root = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("failed to read the current directory")?,
    };

    expo_setup(&root, &ProcessRunner, shell)
}
