//! spoon: manipulate csv files with headers from the command line.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use spoon_core::config::SpoonConfig;
use spoon_exec::{Engine, ExecError};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn init_logging() {
    let filter = EnvFilter::try_from_env("SPOON_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), ExecError> {
    let invocation = cli.command.into_invocation(SpoonConfig::from_env())?;
    let engine = Engine::new(invocation.config, &invocation.preamble)?;
    let summary = engine.run(&invocation.job)?;
    tracing::debug!(?summary, "done");
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        // The reader went away: stop quietly.
        Err(e) if e.is_downstream_closed() => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
