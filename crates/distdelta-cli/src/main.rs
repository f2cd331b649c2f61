// crates/distdelta-cli/src/main.rs

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod io;

#[derive(Parser)]
#[command(name = "distdelta")]
#[command(about = "Binary deltas between successive versions of distfiles", long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate verified deltas for package atoms and record them
    Diff(cmd::diff::DiffArgs),

    /// Reconstruct the distfiles of one package version from recorded deltas
    Patch(cmd::patch::PatchArgs),

    /// List or look up delta database records
    Inspect(cmd::inspect::InspectArgs),
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let clean = match cli.cmd {
        Commands::Diff(args) => cmd::diff::run(args)?,
        Commands::Patch(args) => cmd::patch::run(args)?,
        Commands::Inspect(args) => cmd::inspect::run(args)?,
    };

    Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
