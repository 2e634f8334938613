mod cli;
mod commands;
mod paths;
mod plan;
mod sudo;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use setupkit::{Elevation, SetupConfig, SetupMode};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: SetupConfig,
    pub elevation: Elevation,
}

fn main() -> ExitCode {
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
        config: paths::setup_config(&cli.state_file, &cli.snapshot_dir),
        elevation: if cli.no_sudo {
            Elevation::Disabled
        } else {
            Elevation::sudo()
        },
    };
    log::trace!("verbosity {}", ctx.verbose);

    match dispatch(&ctx, cli.command) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            ui::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(ctx: &Context, command: Command) -> Result<i32> {
    match command {
        Command::Install(args) => {
            commands::setup::run(ctx, SetupMode::Install, args.plan.as_deref())
        }
        Command::Update(args) => {
            commands::setup::run(ctx, SetupMode::Update, args.plan.as_deref())
        }
        Command::Uninstall(args) => {
            commands::setup::run(ctx, SetupMode::Uninstall, args.plan.as_deref())
        }
        Command::Status(args) => commands::status::run(ctx, args.json).map(|()| 0),
        Command::Plan(args) => commands::plan::run(ctx, args.plan.as_deref()).map(|()| 0),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "vixen", &mut io::stdout());
            Ok(0)
        }
    }
}
