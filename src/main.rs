mod cli;
mod commands;
mod config;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub nova_conf: PathBuf,
    pub openstack_bin: Option<PathBuf>,
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
        nova_conf: cli.nova_conf,
        openstack_bin: cli.openstack_bin,
    };

    match cli.command {
        Command::Status(args) => commands::status::run(&ctx, &args),
        Command::Diff(args) => commands::apply::diff(&ctx, &args),
        Command::Apply(args) => commands::apply::run(&ctx, &args.manifest, args.dry_run),
        Command::Show(args) => commands::show::run(&ctx, &args.name, args.json),
        Command::Destroy(args) => commands::show::destroy(&ctx, &args.name, args.dry_run),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "novagg", &mut io::stdout());
            Ok(())
        }
    }
}
