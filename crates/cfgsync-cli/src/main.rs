//! cfgsync CLI
//!
//! Consistency check, store, restore and compare for configuration
//! repositories.

mod artifacts;
mod cli;
mod commands;
mod error;
mod interrupt;
mod output;

use cfgsync_core::CancellationToken;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ReportArgs};
use error::{CliError, Result};
use output::{ConsoleOutput, Output, TeamCityOutput};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = interrupt::cancel_on_interrupt();

    match run(cli.command, &cancel) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            // Stage failures were already reported through the output sink
            if !matches!(e, CliError::Stage { .. }) {
                eprintln!("{}: {}", "error".red().bold(), e);
            }
            std::process::exit(1);
        }
    }
}

/// Log to stderr so stdout carries only command output.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    if verbose {
        tracing::debug!("Verbose mode enabled");
    }
}

fn select_output(report: &ReportArgs) -> Box<dyn Output> {
    if report.ci {
        Box::new(TeamCityOutput::stdout())
    } else {
        Box::new(ConsoleOutput::stdout())
    }
}

fn run(command: Commands, cancel: &CancellationToken) -> Result<bool> {
    match command {
        Commands::Check {
            connection,
            reference,
            target,
            report,
        } => {
            let output = select_output(&report);
            commands::run_check(
                &connection,
                &reference,
                &target,
                &report,
                cancel,
                output.as_ref(),
            )
        }
        Commands::Store {
            connection,
            repository,
            bindings,
            workers,
        } => commands::run_store(
            &connection,
            &repository,
            bindings,
            workers,
            cancel,
            &ConsoleOutput::stdout(),
        ),
        Commands::Restore {
            connection,
            repository,
            bindings,
        } => commands::run_restore(
            &connection,
            &repository,
            bindings,
            cancel,
            &ConsoleOutput::stdout(),
        ),
        Commands::Compare {
            reference,
            target,
            report,
        } => {
            let output = select_output(&report);
            commands::run_compare(&reference, &target, &report, output.as_ref())
        }
    }
}
