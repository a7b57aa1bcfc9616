//! # Ledger Error Types
//!
//! All errors that can occur in the ledger. Every error is raised before the
//! failing operation writes anything, so an `Err` always means "no effect".

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::gate::PolicyError;
use crate::tokens::TokenError;

/// Errors that can occur in the profit ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller does not hold the admin capability.
    #[error("sender not authorized: {caller}")]
    NotAuthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// The sender's share balance does not cover the movement.
    #[error("insufficient balance for {account}: need {requested}, have {available}")]
    InsufficientBalance {
        /// The account being debited.
        account: Address,
        /// The amount requested.
        requested: U256,
        /// The current balance.
        available: U256,
    },

    /// The spender's allowance does not cover the movement.
    #[error("insufficient allowance for {spender} on {owner}: need {requested}, have {available}")]
    InsufficientAllowance {
        /// The balance owner.
        owner: Address,
        /// The spender using the allowance.
        spender: Address,
        /// The amount requested.
        requested: U256,
        /// The remaining allowance.
        available: U256,
    },

    /// Settled profit does not cover the withdrawal.
    #[error("profit balance is not enough: need {requested}, have {available}")]
    InsufficientProfitBalance {
        /// The amount requested.
        requested: U256,
        /// The settled profit available.
        available: U256,
    },

    /// The amount is below the accumulator's resolution.
    #[error("not enough precision: amount {amount} is below the quantum {quantum}")]
    PrecisionError {
        /// The rejected amount.
        amount: U256,
        /// The smallest representable movement.
        quantum: U256,
    },

    /// Fixed-width overflow, underflow or division by zero.
    #[error("arithmetic overflow in ledger calculation")]
    ArithmeticError,

    /// The profit source is already registered.
    #[error("already registered: {token}")]
    AlreadyRegistered {
        /// The duplicate token handle.
        token: Address,
    },

    /// `finalize_profit_sources` has been called.
    #[error("profit sources are final")]
    SourcesFinalized,

    /// The token is a registered profit source and belongs to holders.
    #[error("withdrawal not allowed: {token} is a profit source")]
    WithdrawalNotAllowed {
        /// The protected token handle.
        token: Address,
    },

    /// No profit source has this index.
    #[error("unknown profit source index {0}")]
    UnknownSource(usize),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A mint or transfer collaborator rejected the operation.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// An external payout token rejected a query or transfer.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
