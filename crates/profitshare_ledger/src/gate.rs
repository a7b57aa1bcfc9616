//! # Mint & Transfer Collaborators
//!
//! Minting allowances and time-locks live outside the ledger. The ledger asks
//! a [`Gatekeeper`] before minting and before moving shares, and propagates
//! its [`PolicyError`] unchanged.
//!
//! Call order matters for atomicity: `check_transfer` runs with the other
//! validations, `authorize_mint` runs last, after every ledger-side check has
//! passed, because an allowance collaborator may consume allowance on success.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::admin::AdminRole;

/// Errors raised by mint or transfer collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The minter has no allowance for this amount.
    #[error("amount exceeds minting allowance: {minter} requested {requested}")]
    MintAllowanceExceeded {
        /// The rejected minter.
        minter: Address,
        /// The amount requested.
        requested: U256,
    },

    /// The movement would spend time-locked shares.
    #[error("not enough non-locked tokens: {account} requested {requested}, unlocked {unlocked}")]
    Locked {
        /// The sending account.
        account: Address,
        /// The amount requested.
        requested: U256,
        /// The part of the balance that is free to move.
        unlocked: U256,
    },

    /// Any other collaborator refusal.
    #[error("rejected by policy: {0}")]
    Rejected(String),
}

/// Authorization hooks consulted by the ledger.
pub trait Gatekeeper {
    /// Decides whether `minter` may mint `amount` to `to`.
    ///
    /// # Errors
    ///
    /// A `PolicyError`; the mint is aborted with no effect.
    fn authorize_mint(
        &mut self,
        admin: AdminRole,
        minter: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), PolicyError>;

    /// Decides whether `from`, currently holding `balance`, may move `amount`.
    ///
    /// # Errors
    ///
    /// A `PolicyError`; the transfer is aborted with no effect.
    fn check_transfer(&self, from: Address, balance: U256, amount: U256) -> Result<(), PolicyError> {
        let _ = (from, balance, amount);
        Ok(())
    }
}

/// Default gate: only the admin mints, every transfer is allowed.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdminGate;

impl Gatekeeper for AdminGate {
    fn authorize_mint(
        &mut self,
        admin: AdminRole,
        minter: Address,
        _to: Address,
        amount: U256,
    ) -> Result<(), PolicyError> {
        if admin.is_held_by(minter) {
            Ok(())
        } else {
            Err(PolicyError::MintAllowanceExceeded {
                minter,
                requested: amount,
            })
        }
    }
}
