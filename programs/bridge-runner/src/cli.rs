//! Contains the command line interface for the runner.

use std::path::PathBuf;

use clap::{command, Parser};

/// The command line interface for the runner.
#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct RunnerCli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The subcommands for the runner.
#[derive(Clone, Parser)]
pub enum Commands {
    /// Replay a ledger event log through the bridge.
    Replay(ReplayCmd),
}

/// The arguments for the `replay` subcommand.
#[derive(Clone, Parser)]
#[command(about = "Replay a JSON-lines ledger event log against a controller process")]
pub struct ReplayCmd {
    /// The runner configuration file.
    #[clap(long)]
    pub config: PathBuf,

    /// The JSON-lines event log.
    #[clap(long)]
    pub events: PathBuf,
}
