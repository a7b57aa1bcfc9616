//! Scenario errors.

use std::path::PathBuf;

use alloy_primitives::U256;
use profitshare_ledger::LedgerError;
use thiserror::Error;

/// Errors raised while loading or replaying a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid scenario document.
    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    /// The scenario is well-formed but inconsistent.
    #[error("invalid scenario: {0}")]
    Invalid(String),

    /// A name that is neither a participant, a token nor a hex address.
    #[error("unknown participant '{0}'")]
    UnknownName(String),

    /// An amount that is not a non-negative integer.
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    /// Setting up the ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A step failed unexpectedly.
    #[error("step {step} ({op}) failed: {source}")]
    Step {
        /// 1-based step number.
        step: usize,
        /// The step's operation name.
        op: &'static str,
        /// The ledger's error.
        #[source]
        source: LedgerError,
    },

    /// A read did not return the expected amount.
    #[error("step {step}: expected {what} = {expected}, found {actual}")]
    Expectation {
        /// 1-based step number.
        step: usize,
        /// What was read.
        what: String,
        /// The scenario's value.
        expected: U256,
        /// The ledger's value.
        actual: U256,
    },

    /// An `expect_error` step succeeded or failed differently.
    #[error("step {step}: expected error {expected}, got {actual}")]
    WrongOutcome {
        /// 1-based step number.
        step: usize,
        /// The expected error kind.
        expected: String,
        /// What actually happened.
        actual: String,
    },
}

impl ScenarioError {
    /// True for failures of the scenario's own assertions, as opposed to
    /// unreadable or invalid input.
    #[must_use]
    pub const fn is_expectation(&self) -> bool {
        matches!(
            self,
            Self::Expectation { .. } | Self::WrongOutcome { .. } | Self::Step { .. }
        )
    }
}

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;
