use crate::paths::{ENV_SNAPSHOT_DIR, ENV_STATE_FILE};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use setupkit::session::{DEFAULT_SNAPSHOT_DIR, DEFAULT_STATE_FILE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vixen")]
#[command(author = "Noha Poncelet")]
#[command(version)]
#[command(
    about = "Install, update and uninstall an environment with automatic rollback",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Installation state document
    #[arg(long, global = true, env = ENV_STATE_FILE, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Directory holding snapshots taken before updates
    #[arg(long, global = true, env = ENV_SNAPSHOT_DIR, default_value = DEFAULT_SNAPSHOT_DIR)]
    pub snapshot_dir: PathBuf,

    /// Run elevated steps without the sudo prefix (root shells, containers)
    #[arg(long, global = true)]
    pub no_sudo: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the plan's install section (no installation may exist yet)
    Install(PlanArgs),

    /// Run the plan's update section, rolling back on failure
    Update(PlanArgs),

    /// Run the plan's uninstall section, rolling back on failure
    Uninstall(PlanArgs),

    /// Show what is currently installed
    Status(StatusArgs),

    /// List the plan's tasks without running them
    Plan(PlanArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Plan file (TOML, or JSON with a .json extension) [default: vixen.toml]
    #[arg(short, long)]
    pub plan: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Print the raw state document as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_with_plan() {
        let cli = Cli::try_parse_from([
            "vixen",
            "-vv",
            "--no-sudo",
            "--state-file",
            "/tmp/state.json",
            "update",
            "--plan",
            "demo.toml",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(cli.no_sudo);
        assert_eq!(cli.state_file, PathBuf::from("/tmp/state.json"));
        match cli.command {
            Command::Update(args) => assert_eq!(args.plan, Some(PathBuf::from("demo.toml"))),
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vixen",
            "status",
            "--json",
            "-q",
            "--snapshot-dir",
            "/tmp/snaps",
        ])
        .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.snapshot_dir, PathBuf::from("/tmp/snaps"));
        assert!(matches!(cli.command, Command::Status(StatusArgs { json: true })));
    }
}
