use cdxfetch_core::control::RunInterrupted;
use cdxfetch_core::logging;
use clap::Parser;

mod cli;

use crate::cli::Cli;

/// Conventional exit status for a run stopped by SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Fall back to stderr-only logging if the state dir is unusable.
    if logging::init_logging(cli.verbose).is_err() {
        logging::init_logging_stderr(cli.verbose);
    }

    if let Err(err) = cli.run().await {
        if let Some(interrupted) = err.downcast_ref::<RunInterrupted>() {
            eprintln!("cdxfetch: {}", interrupted);
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("cdxfetch error: {:#}", err);
        std::process::exit(1);
    }
}
