//! # Profit Source Registry
//!
//! Ordered, append-only list of payout tokens. Index = registration order,
//! and that index is the `source_index` callers use everywhere else.
//! Once finalized, membership is frozen for the life of the ledger.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// One registered payout token and its accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSource {
    /// The external token contract acting as the deposit pool.
    pub token: Address,
    /// Scaled cumulative profit per share. Never decreases.
    pub accumulator: U256,
    /// Cumulative deposits observed so far (pool balance plus everything
    /// already paid out). Never decreases.
    pub last_observed: U256,
    /// Cumulative profit paid out to holders.
    pub paid_out: U256,
}

impl ProfitSource {
    /// A freshly registered source. The first sync picks up any value
    /// already resident in the pool.
    #[inline]
    #[must_use]
    pub const fn new(token: Address) -> Self {
        Self {
            token,
            accumulator: U256::ZERO,
            last_observed: U256::ZERO,
            paid_out: U256::ZERO,
        }
    }
}

/// The ordered collection of profit sources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRegistry {
    sources: Vec<ProfitSource>,
    finalized: bool,
}

impl SourceRegistry {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered sources.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no source is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns true once membership is frozen.
    #[inline]
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Returns true if `token` is a registered source.
    #[must_use]
    pub fn contains(&self, token: &Address) -> bool {
        self.sources.iter().any(|source| source.token == *token)
    }

    /// Gets a source by index.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownSource` for an unregistered index.
    #[inline]
    pub fn get(&self, index: usize) -> LedgerResult<&ProfitSource> {
        self.sources.get(index).ok_or(LedgerError::UnknownSource(index))
    }

    /// Returns all sources in registration order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[ProfitSource] {
        &self.sources
    }

    /// Fails if `token` cannot be registered right now.
    ///
    /// # Errors
    ///
    /// `LedgerError::SourcesFinalized` after finalization,
    /// `LedgerError::AlreadyRegistered` for a duplicate.
    pub fn ensure_registrable(&self, token: &Address) -> LedgerResult<()> {
        if self.finalized {
            return Err(LedgerError::SourcesFinalized);
        }
        if self.contains(token) {
            return Err(LedgerError::AlreadyRegistered { token: *token });
        }
        Ok(())
    }

    /// Appends a new source and returns its index.
    ///
    /// # Errors
    ///
    /// Same as [`Self::ensure_registrable`].
    pub fn register(&mut self, token: Address) -> LedgerResult<usize> {
        self.ensure_registrable(&token)?;
        self.sources.push(ProfitSource::new(token));
        Ok(self.sources.len() - 1)
    }

    /// Freezes membership. Returns true if this call changed the state.
    pub fn finalize(&mut self) -> bool {
        let changed = !self.finalized;
        self.finalized = true;
        changed
    }

    /// Overwrites a source with its staged successor.
    pub(crate) fn commit(&mut self, index: usize, source: ProfitSource) {
        if let Some(slot) = self.sources.get_mut(index) {
            debug_assert_eq!(slot.token, source.token);
            *slot = source;
        }
    }
}
