//! boardlink - link chat channels to project boards.

use clap::Parser;
use std::process::ExitCode;

use boardlink::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // The guard flushes the log file when main returns.
    let _log_guard = match logging::init() {
        Ok((guard, _dir)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = Commands::parse();

    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
