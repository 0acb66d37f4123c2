use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Pixelflut server. With no subcommand, runs the network ingest engine,
/// worker reactors and display loop. Width, height, worker count and the
/// listening port are fixed per the protocol's contract,
/// not configurable here.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a single command from a memory-mapped file and exit.
    /// Used for fuzz harnessing of the line parser.
    Fuzz {
        /// Path to the file to memory-map and parse one command from.
        path: PathBuf,
    },
}
