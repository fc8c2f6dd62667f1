//! lintpack CLI - installs a shared lint and format configuration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lintpack::util::diagnostic;
use lintpack::util::Shell;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("lintpack=debug")
    } else {
        EnvFilter::new("lintpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    );

    if let Err(e) = run(cli, &shell) {
        diagnostic::emit_error(&e, shell.use_color());
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Shell) -> Result<()> {
    match cli.command {
        Some(Commands::Install(args)) => commands::install::execute(args, shell),
        Some(Commands::ExpoSetup(args)) => commands::expo::execute(args, shell),
        Some(Commands::Completions(args)) => commands::completions::execute(args),
        None => commands::install::execute(cli.install, shell),
    }
}
