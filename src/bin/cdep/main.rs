//! cdep CLI - compile resolved manifests into build-system dependency scripts

use std::io::IsTerminal;

use anyhow::Result;
use cdep::check::LocalFileError;
use cdep::util::diagnostic::{emit, Diagnostic};
use cdep::CompileError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match diagnostic_for(&e) {
            Some(diagnostic) => emit(&diagnostic, std::io::stderr().is_terminal()),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

/// Errors that carry their own suggestions.
fn diagnostic_for(error: &anyhow::Error) -> Option<Diagnostic> {
    if let Some(CompileError::Consistency(e)) = error.downcast_ref::<CompileError>() {
        return Some(e.to_diagnostic());
    }
    error
        .downcast_ref::<LocalFileError>()
        .map(LocalFileError::to_diagnostic)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("cdep=debug")
    } else {
        EnvFilter::new("cdep=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let working_folder = cli.working_folder;
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(&working_folder, args),
        Commands::Dump(args) => commands::dump::execute(args),
        Commands::Resolve(args) => commands::resolve::execute(&working_folder, args),
        Commands::Check(args) => commands::check::execute(&working_folder, args),
    }
}
