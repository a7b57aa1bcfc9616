//! # Precision Guard
//!
//! A share movement smaller than the quantum `ceil(effective_supply / SCALE)`
//! cannot be told apart from zero by the accumulator, so moving it would drop
//! or duplicate a fraction of profit entitlement. While at least one profit
//! source is registered such movements are rejected.

use alloy_primitives::U256;

use crate::arithmetic::Scale;
use crate::error::{LedgerError, LedgerResult};

/// Rejects sub-quantum share movements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrecisionGuard {
    scale: Scale,
    enabled: bool,
}

impl PrecisionGuard {
    /// Creates a guard for `scale`. A disabled guard accepts everything.
    #[must_use]
    pub const fn new(scale: Scale, enabled: bool) -> Self {
        Self { scale, enabled }
    }

    /// Returns true if the guard is active.
    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.enabled
    }

    /// Checks `amount` against the quantum of the pre-mutation
    /// `effective_supply`. Zero amounts always pass.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::PrecisionError` if sources are registered and
    /// `0 < amount < quantum`.
    pub fn check(self, amount: U256, effective_supply: U256, sources_registered: bool) -> LedgerResult<()> {
        if !self.enabled || !sources_registered || amount.is_zero() {
            return Ok(());
        }
        let quantum = self.scale.quantum(effective_supply);
        if amount < quantum {
            return Err(LedgerError::PrecisionError { amount, quantum });
        }
        Ok(())
    }
}
