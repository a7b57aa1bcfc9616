//! # PROFITSHARE
//!
//! Operator tooling for the profit ledger: TOML scenario files and a replay
//! runner that drives a [`ProfitLedger`](profitshare_ledger::ProfitLedger)
//! over an in-memory token book, checking expectations as it goes and
//! collecting the EVM logs a deployment would emit.
//!
//! ```rust,ignore
//! let scenario = Scenario::from_file("scenarios/proportional.toml")?;
//! let report = Runner::replay(&scenario)?;
//! println!("{} steps, {} logs", report.steps, report.logs.len());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod runner;
pub mod scenario;

pub use error::{ScenarioError, ScenarioResult};
pub use runner::{error_kind, EmittedLog, RunReport, Runner, ERROR_KINDS};
pub use scenario::{parse_amount, Amount, Directory, Scenario, Step, TokenDeployment};
