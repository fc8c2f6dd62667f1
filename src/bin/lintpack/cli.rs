//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use lintpack::core::{Archetype, PackageManager};
use lintpack::util::ColorChoice;

/// lintpack - install a shared ESLint, Prettier and Stylelint configuration
///
/// Running `lintpack` without a subcommand is the same as `lintpack install`.
#[derive(Parser)]
#[command(name = "lintpack")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for status messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(flatten)]
    pub install: InstallArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the configuration into the current project
    Install(InstallArgs),

    /// Convert a fresh Expo project to app.config.ts and the fast Metro resolver
    ExpoSetup(ExpoSetupArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Args, Clone, Debug, Default)]
pub struct InstallArgs {
    /// Project directory (defaults to the nearest directory with package.json)
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Template root directory
    #[arg(long, value_name = "DIR", env = "LINTPACK_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Use this project type instead of detecting it
    /// (next-js-postgresql, expo-postgresql, next-js, expo, create-react-app, node-js)
    #[arg(long, value_name = "TYPE")]
    pub archetype: Option<Archetype>,

    /// Package manager to use (pnpm, yarn, npm)
    #[arg(long, value_name = "NAME")]
    pub package_manager: Option<PackageManager>,

    /// Update files without running the package manager
    #[arg(long)]
    pub no_install: bool,

    /// Show what would be installed without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Patch the installed Next.js to refresh the router after navigation
    #[arg(long)]
    pub patch_next: bool,
}

#[derive(Args, Debug)]
pub struct ExpoSetupArgs {
    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
