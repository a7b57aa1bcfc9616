//! # Exclusion Subsystem
//!
//! Excluded accounts keep their shares but drop out of the profit-sharing
//! denominator. [`SupplyBook`] tracks both counters so that
//! `effective = total - excluded` always equals the sum of non-excluded
//! balances. Exclusion is one-way.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::arithmetic::SafeMath;
use crate::error::LedgerResult;
use crate::events::LedgerEvent;
use crate::gate::Gatekeeper;
use crate::ledger::ProfitLedger;
use crate::tokens::TokenLedger;

/// Total and excluded share supply.
///
/// Every adjustment returns a new value; the ledger commits it only when the
/// whole operation succeeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyBook {
    total: U256,
    excluded: U256,
}

impl SupplyBook {
    /// Sum of all balances.
    #[inline]
    #[must_use]
    pub const fn total(self) -> U256 {
        self.total
    }

    /// Sum of excluded balances.
    #[inline]
    #[must_use]
    pub const fn excluded(self) -> U256 {
        self.excluded
    }

    /// The profit-sharing denominator.
    #[inline]
    #[must_use]
    pub fn effective(self) -> U256 {
        // excluded <= total holds for every committed book
        self.total.saturating_sub(self.excluded)
    }

    /// Supply after minting `amount` to an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` on overflow.
    pub fn after_mint(self, amount: U256, to_excluded: bool) -> LedgerResult<Self> {
        Ok(Self {
            total: self.total.safe_add(amount)?,
            excluded: if to_excluded {
                self.excluded.safe_add(amount)?
            } else {
                self.excluded
            },
        })
    }

    /// Supply after moving `amount` between two accounts.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` on overflow or underflow.
    pub fn after_transfer(self, amount: U256, from_excluded: bool, to_excluded: bool) -> LedgerResult<Self> {
        let excluded = match (from_excluded, to_excluded) {
            (true, false) => self.excluded.safe_sub(amount)?,
            (false, true) => self.excluded.safe_add(amount)?,
            _ => self.excluded,
        };
        Ok(Self {
            total: self.total,
            excluded,
        })
    }

    /// Supply after excluding an account holding `balance`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` if `excluded` would pass `total`.
    pub fn after_exclusion(self, balance: U256) -> LedgerResult<Self> {
        let excluded = self.excluded.safe_add(balance)?;
        // keeps excluded <= total
        self.total.safe_sub(excluded)?;
        Ok(Self {
            total: self.total,
            excluded,
        })
    }
}

impl<T: TokenLedger, G: Gatekeeper> ProfitLedger<T, G> {
    /// Removes `account`'s balance from the profit-sharing base.
    ///
    /// Everything the account earned so far is settled first and stays
    /// withdrawable. Excluding an already excluded account does nothing.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` for anyone but the admin, or a token or arithmetic
    /// error from the sync.
    pub fn exclude_from_profits(&mut self, caller: Address, account: Address) -> LedgerResult<()> {
        self.state.admin.authorize(caller)?;
        let mut record = self.account_or_default(account);
        if record.is_excluded() {
            return Ok(());
        }

        let synced = self.stage_sync_all()?;
        for (index, staged) in synced.iter().enumerate() {
            record.settle(index, &staged.source, self.scale)?;
        }
        let supply = self.state.supply.after_exclusion(record.balance())?;
        record.mark_excluded();

        self.commit_synced(&synced);
        let balance = record.balance();
        self.state.accounts.insert(account, record);
        self.state.supply = supply;
        self.events.push(LedgerEvent::ExcludedFromProfits { account, balance });
        tracing::info!(
            "Excluded {} from profits ({} shares, effective supply now {})",
            account,
            balance,
            supply.effective()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    fn book(total: u64, excluded: u64) -> SupplyBook {
        SupplyBook {
            total: U256::from(total),
            excluded: U256::from(excluded),
        }
    }

    #[test]
    fn test_effective() {
        assert_eq!(book(1000, 400).effective(), U256::from(600));
    }

    #[test]
    fn test_mint_to_excluded() {
        assert_eq!(book(1000, 400).after_mint(U256::from(50), true), Ok(book(1050, 450)));
        assert_eq!(book(1000, 400).after_mint(U256::from(50), false), Ok(book(1050, 400)));
    }

    #[test]
    fn test_transfer_directions() {
        let supply = book(1000, 400);
        assert_eq!(supply.after_transfer(U256::from(100), true, false), Ok(book(1000, 300)));
        assert_eq!(supply.after_transfer(U256::from(100), false, true), Ok(book(1000, 500)));
        assert_eq!(supply.after_transfer(U256::from(100), true, true), Ok(supply));
        assert_eq!(supply.after_transfer(U256::from(100), false, false), Ok(supply));
    }

    #[test]
    fn test_exclusion_bounded_by_total() {
        assert_eq!(book(1000, 400).after_exclusion(U256::from(600)), Ok(book(1000, 1000)));
        assert_eq!(
            book(1000, 400).after_exclusion(U256::from(601)),
            Err(LedgerError::ArithmeticError)
        );
    }
}
