use std::fs::File;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use memmap2::Mmap;
use pixelflut_core::framebuffer::FrameBuffer;
use pixelflut_parser::parse_command;
use tracing::Level;

mod cli_args;
mod lifecycle;
mod server;
mod sinks;

use cli_args::{CliArgs, Command};

fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(if cfg!(debug_assertions) {
            Level::DEBUG.into()
        } else {
            Level::INFO.into()
        })
        .from_env()?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = CliArgs::parse();

    match args.command {
        Some(Command::Fuzz { path }) => Ok(run_fuzz_target(&path)),
        None => {
            lifecycle::run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// Memory-maps path and parses exactly one command from it against a
// throwaway framebuffer. Must never panic on malformed or truncated input.
fn run_fuzz_target(path: &std::path::Path) -> ExitCode {
    let result = (|| -> eyre::Result<()> {
        let file = File::open(path).context("failed to open fuzz input")?;
        let mapped = unsafe { Mmap::map(&file) }.context("failed to mmap fuzz input")?;

        let fb = FrameBuffer::new(pixelflut_core::WIDTH, pixelflut_core::HEIGHT);
        let mut response = Vec::new();
        parse_command(&mapped, 0, &fb, &mut response);
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fuzz target failed");
            ExitCode::FAILURE
        }
    }
}
