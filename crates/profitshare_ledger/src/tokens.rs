//! # External Payout Tokens
//!
//! The ledger never holds payout value itself; it holds balances *in*
//! external token contracts and reads them to detect deposits. This module is
//! the boundary to those contracts.
//!
//! [`TokenLedger`] is what the engine calls. [`TokenBook`] is an in-memory,
//! multi-token ERC-20 book used by the operator tooling, tests and benches.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors raised by an external payout token. Propagated unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No token contract lives at this address.
    #[error("unknown token {0}")]
    UnknownToken(Address),

    /// A token already lives at this address.
    #[error("token {0} already deployed")]
    AlreadyDeployed(Address),

    /// The holder's token balance does not cover the transfer.
    #[error("token {token}: insufficient funds for {holder}: need {requested}, have {available}")]
    InsufficientFunds {
        /// The token contract.
        token: Address,
        /// The debited holder.
        holder: Address,
        /// The amount requested.
        requested: U256,
        /// The holder's balance.
        available: U256,
    },

    /// The recipient's token balance would overflow.
    #[error("token {0}: balance overflow")]
    Overflow(Address),

    /// The token contract refused the call.
    #[error("token {token} rejected the transfer: {reason}")]
    Rejected {
        /// The token contract.
        token: Address,
        /// Why it refused.
        reason: String,
    },
}

/// Read and transfer access to external payout tokens.
///
/// Implementations must be atomic per call: a failed `transfer` leaves every
/// balance untouched.
pub trait TokenLedger {
    /// Returns `holder`'s balance in `token`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::UnknownToken` if `token` does not exist.
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, TokenError>;

    /// Moves `amount` of `token` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Any `TokenError`; the ledger reverts the enclosing operation.
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError>;
}

/// A token transfer that the book executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenTransfer {
    /// The token contract.
    pub token: Address,
    /// Debited holder (zero address for the initial deployment supply).
    pub from: Address,
    /// Credited holder.
    pub to: Address,
    /// Amount moved.
    pub amount: U256,
}

#[derive(Clone, Debug, Default)]
struct TokenState {
    balances: HashMap<Address, U256>,
    total_supply: U256,
    paused: bool,
}

/// In-memory ERC-20 book holding any number of payout tokens.
///
/// - O(1) balance lookups by `(token, holder)`
/// - Every executed transfer is recorded for log emission
#[derive(Clone, Debug, Default)]
pub struct TokenBook {
    tokens: HashMap<Address, TokenState>,
    journal: Vec<TokenTransfer>,
}

impl TokenBook {
    /// Creates an empty token book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys a token at `token`, minting `supply` to `holder`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::AlreadyDeployed` if the address is taken.
    pub fn deploy(&mut self, token: Address, holder: Address, supply: U256) -> Result<(), TokenError> {
        if self.tokens.contains_key(&token) {
            return Err(TokenError::AlreadyDeployed(token));
        }
        let mut state = TokenState {
            total_supply: supply,
            ..TokenState::default()
        };
        state.balances.insert(holder, supply);
        self.tokens.insert(token, state);
        self.journal.push(TokenTransfer {
            token,
            from: Address::ZERO,
            to: holder,
            amount: supply,
        });
        Ok(())
    }

    /// Returns true if a token lives at `token`.
    #[inline]
    #[must_use]
    pub fn contains(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// Returns the number of deployed tokens.
    #[inline]
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Returns the total supply of `token`.
    #[must_use]
    pub fn total_supply(&self, token: &Address) -> Option<U256> {
        self.tokens.get(token).map(|state| state.total_supply)
    }

    /// Pauses or resumes a token. A paused token rejects every transfer.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::UnknownToken` if `token` does not exist.
    pub fn set_paused(&mut self, token: Address, paused: bool) -> Result<(), TokenError> {
        let state = self
            .tokens
            .get_mut(&token)
            .ok_or(TokenError::UnknownToken(token))?;
        state.paused = paused;
        Ok(())
    }

    /// Drains the record of executed transfers.
    pub fn drain_transfers(&mut self) -> Vec<TokenTransfer> {
        std::mem::take(&mut self.journal)
    }
}

impl TokenLedger for TokenBook {
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, TokenError> {
        let state = self.tokens.get(&token).ok_or(TokenError::UnknownToken(token))?;
        Ok(state.balances.get(&holder).copied().unwrap_or_default())
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TokenError> {
        let state = self
            .tokens
            .get_mut(&token)
            .ok_or(TokenError::UnknownToken(token))?;
        if state.paused {
            return Err(TokenError::Rejected {
                token,
                reason: "token is paused".to_string(),
            });
        }

        let from_balance = state.balances.get(&from).copied().unwrap_or_default();
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientFunds {
                token,
                holder: from,
                requested: amount,
                available: from_balance,
            })?;

        if from != to {
            let to_balance = state.balances.get(&to).copied().unwrap_or_default();
            let credited = to_balance
                .checked_add(amount)
                .ok_or(TokenError::Overflow(token))?;
            state.balances.insert(from, remaining);
            state.balances.insert(to, credited);
        }

        self.journal.push(TokenTransfer {
            token,
            from,
            to,
            amount,
        });
        Ok(())
    }
}
