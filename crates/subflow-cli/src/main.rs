//! # subflow CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use subflow_cli::check::{run_check, CheckArgs};
use subflow_cli::policy::{run_policy, run_transitions, PolicyArgs, TransitionsArgs};

/// Subscription lifecycle policy tool.
///
/// Inspects the role-gated lifecycle table and dry-runs subscription
/// updates against it.
#[derive(Parser, Debug)]
#[command(name = "subflow", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the lifecycle table.
    Policy(PolicyArgs),

    /// Show the fields and transitions a role has in one state.
    Transitions(TransitionsArgs),

    /// Evaluate an update between two subscription snapshots.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Policy(args) => run_policy(&args),
        Commands::Transitions(args) => run_transitions(&args),
        Commands::Check(args) => run_check(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
