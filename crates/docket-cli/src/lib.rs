//! # docket-cli — Command-Line Interface
//!
//! A clap front-end over `docket-engine`.
//!
//! ## Subcommands
//!
//! - `build`, `sign`, `verify`, `validate`, `correct`, `replicate`:
//!   document operations over `[infile] [outfile]`
//! - `keygen`: write a new Ed25519 key pair
//! - `bulk`: the bulk engine over stdin/stdout
//! - `serve`: the HTTP server
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; behaviour lives in the engine.
//! - Data goes to stdout, logs go to stderr.
//! - Pipeline failures print as `code=<n>, message=<text>` and exit 1.

pub mod bulk;
pub mod document;
pub mod io;
pub mod keys;
pub mod serve;

use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docket_core::DocketError;

use crate::document::{BuildArgs, CorrectArgs, PlainArgs, SignArgs, VerifyArgs};
use crate::keys::KeygenArgs;
use crate::serve::ServeArgs;

/// Process electronic business documents.
#[derive(Parser, Debug)]
#[command(name = "docket", version, about, long_about = None)]
pub struct Cli {
    /// Log more. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

/// Output flags accepted by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalOpts {
    /// Pretty-print JSON output.
    #[arg(short, long, global = true)]
    pub indent: bool,

    /// Overwrite the output file if it exists.
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Write the result back to the input file.
    #[arg(short = 'w', long, global = true)]
    pub in_place: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Calculate and validate a document, optionally inside an envelope.
    Build(BuildArgs),
    /// Build and sign an envelope.
    Sign(SignArgs),
    /// Check an envelope's signatures against a public key.
    Verify(VerifyArgs),
    /// Validate an envelope or document without changing it.
    Validate(PlainArgs),
    /// Issue a credit or debit note for an invoice.
    Correct(CorrectArgs),
    /// Copy a document with its identity reset.
    Replicate(PlainArgs),
    /// Generate an Ed25519 key pair.
    Keygen(KeygenArgs),
    /// Process a stream of JSON requests from stdin.
    Bulk,
    /// Serve the pipeline over HTTP.
    Serve(ServeArgs),
}

impl Cli {
    /// Log filter for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Run a parsed command line.
pub fn run(cli: Cli, stdin: &mut dyn Read, stdout: &mut dyn Write) -> Result<()> {
    let opts = &cli.global;
    let registry = || docket_regimes::registry().context("loading rule sets");
    match &cli.command {
        Command::Build(args) => document::run_build(&registry()?, args, opts, stdin, stdout),
        Command::Sign(args) => document::run_sign(&registry()?, args, opts, stdin, stdout),
        Command::Verify(args) => document::run_verify(&registry()?, args, stdin),
        Command::Validate(args) => document::run_validate(&registry()?, args, stdin),
        Command::Correct(args) => document::run_correct(&registry()?, args, opts, stdin, stdout),
        Command::Replicate(args) => {
            document::run_replicate(&registry()?, args, opts, stdin, stdout)
        }
        Command::Keygen(args) => keys::run_keygen(args, opts, stdout),
        Command::Bulk => bulk::run_bulk(registry()?),
        Command::Serve(args) => serve::run_serve(registry()?, args),
    }
}

/// The line printed to stderr for a failure.
pub fn error_line(err: &anyhow::Error) -> String {
    match err.downcast_ref::<DocketError>() {
        Some(e) => e.render(),
        None => format!("{err:#}"),
    }
}
