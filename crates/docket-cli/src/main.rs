//! # docket CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docket_cli::{error_line, run, Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // `serve` logs at info unless RUST_LOG says otherwise.
    let filter = match (&cli.command, cli.verbose) {
        (Command::Serve(_), 0) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        }
        _ => EnvFilter::new(cli.log_level()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Unlocked handles: `bulk` reads stdin again from a tokio blocking thread.
    match run(cli, &mut std::io::stdin(), &mut std::io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{e:?}");
            eprintln!("{}", error_line(&e));
            ExitCode::from(1)
        }
    }
}
