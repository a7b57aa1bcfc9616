//! # Withdrawal & Recovery
//!
//! Paying settled profit out of a pool, and the admin's safety valve for
//! tokens sent to the ledger by mistake. The valve is closed for every
//! registered profit source: those balances belong to holders.

use alloy_primitives::{Address, U256};

use crate::arithmetic::SafeMath;
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::gate::Gatekeeper;
use crate::ledger::ProfitLedger;
use crate::tokens::TokenLedger;

impl<T: TokenLedger, G: Gatekeeper> ProfitLedger<T, G> {
    /// Pays `amount` of settled profit from source `index` to `caller`.
    ///
    /// Only the queried source is synced. The ledger's own address cannot
    /// withdraw: its payout never leaves the pool.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` if `caller` is the ledger's own address
    /// - `UnknownSource` for an unregistered index
    /// - `InsufficientProfitBalance` if settled profit is below `amount`
    /// - the payout token's error if its transfer fails
    pub fn withdraw_profit(&mut self, caller: Address, amount: U256, index: usize) -> LedgerResult<()> {
        if caller == self.state.address {
            return Err(LedgerError::NotAuthorized { caller });
        }
        let mut synced = self.stage_sync(index)?;
        let mut record = self.account_or_default(caller);
        record.settle(index, &synced.source, self.scale)?;

        let available = record.settled(index);
        if available < amount {
            return Err(LedgerError::InsufficientProfitBalance {
                requested: amount,
                available,
            });
        }
        record.take_settled(index, amount)?;
        synced.source.paid_out = synced.source.paid_out.safe_add(amount)?;

        let token = synced.source.token;
        self.tokens.transfer(token, self.state.address, caller, amount)?;

        self.commit_source(index, &synced);
        self.state.accounts.insert(caller, record);
        self.events.push(LedgerEvent::ProfitWithdrawn {
            account: caller,
            index,
            token,
            amount,
        });
        tracing::info!(
            "{} withdrew {} from profit source #{} ({} left)",
            caller,
            amount,
            index,
            available - amount
        );
        Ok(())
    }

    /// Sends `amount` of a stray `token` held by the ledger to the admin.
    ///
    /// # Errors
    ///
    /// - `WithdrawalNotAllowed` if `token` is a registered profit source,
    ///   whoever the caller is
    /// - `NotAuthorized` for anyone but the admin
    /// - the token's error if its transfer fails
    pub fn recover_funds(&mut self, caller: Address, token: Address, amount: U256) -> LedgerResult<()> {
        if self.state.registry.contains(&token) {
            return Err(LedgerError::WithdrawalNotAllowed { token });
        }
        self.state.admin.authorize(caller)?;

        self.tokens.transfer(token, self.state.address, caller, amount)?;
        self.events.push(LedgerEvent::FundsRecovered {
            token,
            to: caller,
            amount,
        });
        tracing::info!("Recovered {} of {} to admin {}", amount, token, caller);
        Ok(())
    }
}
