mod cli;
mod commands;
mod config;
mod paths;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConnectionArgs};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Overall deadline for remote calls, in seconds
    pub deadline: Option<u64>,
    pub connection: ConnectionArgs,
}

fn main() -> Result<()> {
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        deadline: cli.deadline,
        connection: cli.connection,
    };

    match cli.command {
        Command::Create(args) => commands::lifecycle::create(&ctx, args),
        Command::Read(args) => commands::lifecycle::read(&ctx, &args.address),
        Command::Refresh(args) => commands::refresh::run(&ctx, &args),
        Command::Update(args) => commands::lifecycle::update(&ctx, args),
        Command::Delete(args) => commands::lifecycle::delete(&ctx, &args.address),
        Command::Import(args) => commands::lifecycle::import(&ctx, &args),
        Command::Lookup(args) => commands::remote::lookup(&ctx, &args),
        Command::Discover(args) => commands::remote::discover(&ctx, args),
        Command::List => commands::lifecycle::list(&ctx),
        Command::Show(args) => commands::lifecycle::show(&ctx, &args.address),
        Command::Config(cmd) => commands::config::run(&ctx, &cmd),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "clusterform", &mut io::stdout());
            Ok(())
        }
    }
}
