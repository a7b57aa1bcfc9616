//! # Holder Accounts
//!
//! Per-holder share balance plus one snapshot and one settled-profit slot per
//! profit source. The per-source vectors grow lazily: a missing slot reads as
//! zero, which is exactly the accumulator value of a source registered after
//! the account last settled.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::accumulator;
use crate::arithmetic::{SafeMath, Scale};
use crate::error::LedgerResult;
use crate::registry::ProfitSource;

/// A share holder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    balance: U256,
    excluded: bool,
    snapshots: Vec<U256>,
    settled: Vec<U256>,
}

impl Account {
    /// Returns the share balance.
    #[inline]
    #[must_use]
    pub const fn balance(&self) -> U256 {
        self.balance
    }

    /// Returns true if the account is excluded from profits.
    #[inline]
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// The balance that earns profit: zero once excluded.
    #[inline]
    #[must_use]
    pub const fn participating_balance(&self) -> U256 {
        if self.excluded {
            U256::ZERO
        } else {
            self.balance
        }
    }

    /// Accumulator value last seen for source `index`.
    #[inline]
    #[must_use]
    pub fn snapshot(&self, index: usize) -> U256 {
        self.snapshots.get(index).copied().unwrap_or_default()
    }

    /// Profit settled for source `index` and not yet withdrawn.
    #[inline]
    #[must_use]
    pub fn settled(&self, index: usize) -> U256 {
        self.settled.get(index).copied().unwrap_or_default()
    }

    /// Settled profit plus what a settle against `accumulator` would add.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` on overflow.
    pub fn pending(&self, index: usize, accumulator: U256, scale: Scale) -> LedgerResult<U256> {
        let owed = accumulator::owed(
            accumulator,
            self.snapshot(index),
            self.participating_balance(),
            scale,
        )?;
        self.settled(index).safe_add(owed)
    }

    /// Credits profit owed for one source and advances the snapshot.
    /// Returns the amount credited.
    pub(crate) fn settle(
        &mut self,
        index: usize,
        source: &ProfitSource,
        scale: Scale,
    ) -> LedgerResult<U256> {
        let owed = accumulator::owed(
            source.accumulator,
            self.snapshot(index),
            self.participating_balance(),
            scale,
        )?;
        self.ensure_slots(index + 1);
        self.settled[index] = self.settled[index].safe_add(owed)?;
        self.snapshots[index] = source.accumulator;
        Ok(owed)
    }

    /// Settles against every source in order.
    pub(crate) fn settle_all(&mut self, sources: &[ProfitSource], scale: Scale) -> LedgerResult<()> {
        for (index, source) in sources.iter().enumerate() {
            self.settle(index, source, scale)?;
        }
        Ok(())
    }

    pub(crate) fn credit(&mut self, amount: U256) -> LedgerResult<()> {
        self.balance = self.balance.safe_add(amount)?;
        Ok(())
    }

    pub(crate) fn debit(&mut self, amount: U256) -> LedgerResult<()> {
        self.balance = self.balance.safe_sub(amount)?;
        Ok(())
    }

    pub(crate) fn take_settled(&mut self, index: usize, amount: U256) -> LedgerResult<()> {
        self.ensure_slots(index + 1);
        self.settled[index] = self.settled[index].safe_sub(amount)?;
        Ok(())
    }

    pub(crate) fn mark_excluded(&mut self) {
        self.excluded = true;
    }

    fn ensure_slots(&mut self, len: usize) {
        if self.snapshots.len() < len {
            self.snapshots.resize(len, U256::ZERO);
        }
        if self.settled.len() < len {
            self.settled.resize(len, U256::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn source_at(accumulator: u64) -> ProfitSource {
        ProfitSource {
            accumulator: U256::from(accumulator),
            ..ProfitSource::new(Address::repeat_byte(0xAA))
        }
    }

    #[test]
    fn test_missing_slots_read_zero() {
        let account = Account::default();
        assert_eq!(account.snapshot(3), U256::ZERO);
        assert_eq!(account.settled(3), U256::ZERO);
    }

    #[test]
    fn test_settle_credits_and_advances() {
        let scale = Scale::from_decimals(3).unwrap();
        let mut account = Account::default();
        account.credit(U256::from(50)).unwrap();

        // 20 per share at scale 1000 -> 50 * 20 / 1000 = 1
        let owed = account.settle(0, &source_at(20), scale).unwrap();
        assert_eq!(owed, U256::from(1));
        assert_eq!(account.settled(0), U256::from(1));
        assert_eq!(account.snapshot(0), U256::from(20));

        // settling again at the same accumulator is a no-op
        assert_eq!(account.settle(0, &source_at(20), scale).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_excluded_earns_nothing_but_advances() {
        let scale = Scale::from_decimals(3).unwrap();
        let mut account = Account::default();
        account.credit(U256::from(5000)).unwrap();
        account.mark_excluded();

        assert_eq!(account.settle(1, &source_at(400), scale).unwrap(), U256::ZERO);
        assert_eq!(account.snapshot(1), U256::from(400));
        assert_eq!(account.pending(1, U256::from(900), scale), Ok(U256::ZERO));
    }

    #[test]
    fn test_pending_adds_settled() {
        let scale = Scale::from_decimals(3).unwrap();
        let mut account = Account::default();
        account.credit(U256::from(1000)).unwrap();
        account.settle(0, &source_at(2000), scale).unwrap();

        assert_eq!(account.settled(0), U256::from(2000));
        assert_eq!(account.pending(0, U256::from(3000), scale), Ok(U256::from(3000)));
    }

    #[test]
    fn test_take_settled_underflow() {
        let mut account = Account::default();
        assert!(account.take_settled(0, U256::from(1)).is_err());
    }
}
