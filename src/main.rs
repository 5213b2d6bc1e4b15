mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod prompt;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context { quiet: cli.quiet };

    match cli.command {
        Commands::Create(args) => commands::create::run(&ctx, args),
    }
}
