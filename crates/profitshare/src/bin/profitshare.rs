//! # PROFITSHARE CLI
//!
//! Replays scenario files against a fresh ledger.
//!
//! ```bash
//! # Replay and print the emitted logs
//! profitshare run scenarios/proportional.toml
//!
//! # Replay and dump the final ledger state as JSON
//! profitshare run scenarios/exclusion.toml --dump-state
//!
//! # Parse and validate only
//! profitshare check scenarios/exclusion.toml
//! ```
//!
//! Exit codes: 0 on success, 1 when an expectation fails, 2 on unreadable
//! or invalid input.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use profitshare::{Directory, RunReport, Runner, Scenario, ScenarioError};
use profitshare_chain::{DepositKind, EventParser, LogRecord};
use tracing_subscriber::EnvFilter;

/// Profit ledger scenario runner
#[derive(Parser)]
#[command(name = "profitshare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario
    Run {
        /// Scenario file (TOML)
        file: PathBuf,

        /// Print the final ledger state as JSON
        #[arg(long)]
        dump_state: bool,
    },

    /// Parse and validate a scenario without running it
    Check {
        /// Scenario file (TOML)
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let result = match cli.command {
        Commands::Run { file, dump_state } => run(&file, dump_state),
        Commands::Check { file } => check(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_expectation() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn run(file: &Path, dump_state: bool) -> Result<(), ScenarioError> {
    let scenario = Scenario::from_file(file)?;
    let directory = scenario.validate()?;
    if let Some(name) = &scenario.name {
        println!("Scenario: {name}");
    }

    let report = Runner::replay(&scenario)?;
    print_report(&report, &directory);

    if dump_state {
        let json = serde_json::to_string_pretty(&report.state)
            .map_err(|e| ScenarioError::Invalid(format!("cannot serialize state: {e}")))?;
        println!("{json}");
    }
    Ok(())
}

fn check(file: &Path) -> Result<(), ScenarioError> {
    let scenario = Scenario::from_file(file)?;
    scenario.validate()?;
    println!(
        "{}: ok ({} tokens, {} steps)",
        file.display(),
        scenario.tokens.len(),
        scenario.steps.len()
    );
    Ok(())
}

fn label(directory: &Directory, address: &Address) -> String {
    directory
        .name_of(address)
        .map_or_else(|| address.to_string(), str::to_string)
}

/// Share and token `Transfer` logs share a signature; the emitter tells
/// them apart.
fn describe(record: &LogRecord, ledger: Address, directory: &Directory) -> String {
    if record.address == ledger {
        return match EventParser::parse_ledger_event(record) {
            Ok(event) => format!("{} {:?}", event.name(), event),
            Err(e) => format!("unreadable log: {e}"),
        };
    }
    match EventParser::parse_erc20_transfer(record) {
        Ok(transfer) => format!(
            "ERC20 Transfer {} {} -> {} ({})",
            label(directory, &transfer.token),
            label(directory, &transfer.from),
            label(directory, &transfer.to),
            transfer.value
        ),
        Err(e) => format!("unreadable log: {e}"),
    }
}

fn print_report(report: &RunReport, directory: &Directory) {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  {} steps, {} logs", report.steps, report.logs.len());
    println!("═══════════════════════════════════════════════════════════════════");

    for log in &report.logs {
        let emitter = label(directory, &log.record.address);
        println!("{:>4}  {:<8} {}", log.step, emitter, describe(&log.record, report.state.address(), directory));
    }

    if !report.deposits.is_empty() {
        println!();
        println!("Deposits:");
        for deposit in &report.deposits {
            let kind = match deposit.kind {
                DepositKind::Profit { index } => format!("profit source #{index}"),
                DepositKind::Stray => "stray".to_string(),
            };
            println!(
                "  {} {} from {} ({kind})",
                deposit.amount,
                label(directory, &deposit.token),
                label(directory, &deposit.from)
            );
        }
    }

    let supply = report.state.supply();
    println!();
    println!(
        "Total supply {} / excluded {} / effective {}",
        supply.total(),
        supply.excluded(),
        supply.effective()
    );
}
