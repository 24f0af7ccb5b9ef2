mod cli;
mod commands;
mod config;
mod operators;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub config: config::Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity; RUST_LOG wins when set
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
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "sapagent", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        quiet: cli.quiet,
        config: config::Config::load(cli.config.as_deref())?,
    };

    match cli.command {
        Command::Operators => commands::operators::run(&ctx),
        Command::Run(args) => commands::run::run(&ctx, args),
        Command::Completions { .. } => Ok(()),
    }
}
