//! # The Profit Ledger
//!
//! Share balances plus lazy profit accounting over any number of payout
//! tokens. Every public mutation is one all-or-nothing transaction:
//!
//! ```text
//! validate ──> stage sync (every source) ──> stage settle (touched accounts)
//!                                                     │
//!                        ┌────────────────────────────┘
//!                        ▼
//!            stage balance / supply change ──> external calls ──> commit
//! ```
//!
//! Staged values are plain copies. Nothing in `self` is written until the last
//! fallible step (including the external token transfer or the mint
//! collaborator) has returned `Ok`, so an `Err` leaves the ledger untouched.
//!
//! Withdrawals and exclusion live in their own modules as further `impl`
//! blocks on [`ProfitLedger`].

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::accumulator::{self, Synced};
use crate::account::Account;
use crate::admin::AdminRole;
use crate::arithmetic::{SafeMath, Scale};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::exclusion::SupplyBook;
use crate::gate::{AdminGate, Gatekeeper};
use crate::precision::PrecisionGuard;
use crate::registry::{ProfitSource, SourceRegistry};
use crate::tokens::TokenLedger;

// ============================================================================
// Persistent state
// ============================================================================

/// Everything the ledger owns. Serializable for snapshots and state dumps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// The ledger's own address: the holder of every payout pool.
    pub(crate) address: Address,
    pub(crate) admin: AdminRole,
    pub(crate) supply: SupplyBook,
    pub(crate) registry: SourceRegistry,
    pub(crate) accounts: BTreeMap<Address, Account>,
    pub(crate) allowances: BTreeMap<Address, BTreeMap<Address, U256>>,
}

impl LedgerState {
    /// Empty state for a ledger living at `address`.
    #[must_use]
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            admin: AdminRole::new(admin),
            supply: SupplyBook::default(),
            registry: SourceRegistry::new(),
            accounts: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    /// The ledger's address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The admin capability.
    #[must_use]
    pub const fn admin(&self) -> AdminRole {
        self.admin
    }

    /// Supply counters.
    #[must_use]
    pub const fn supply(&self) -> SupplyBook {
        self.supply
    }

    /// The profit source registry.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Every account that ever held or received shares.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    /// Checks the supply counters against the account records, every
    /// account snapshot against its source's accumulator, and every
    /// source's `paid_out` against its `last_observed`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` describing the first mismatch.
    pub fn verify(&self, scale: Scale) -> LedgerResult<()> {
        let mut total = U256::ZERO;
        let mut excluded = U256::ZERO;
        for account in self.accounts.values() {
            total = total.safe_add(account.balance())?;
            if account.is_excluded() {
                excluded = excluded.safe_add(account.balance())?;
            }
        }
        if total != self.supply.total() || excluded != self.supply.excluded() {
            return Err(LedgerError::InvalidConfig(format!(
                "supply counters ({}, {}) do not match account balances ({total}, {excluded})",
                self.supply.total(),
                self.supply.excluded()
            )));
        }
        scale.ensure_representable(total).map_err(|_| {
            LedgerError::InvalidConfig(format!("total supply {total} exceeds the ceiling for {scale}"))
        })?;

        for (index, source) in self.registry.as_slice().iter().enumerate() {
            if source.paid_out > source.last_observed {
                return Err(LedgerError::InvalidConfig(format!(
                    "profit source #{index} paid out {} but observed only {}",
                    source.paid_out, source.last_observed
                )));
            }
            if let Some((holder, account)) = self
                .accounts
                .iter()
                .find(|(_, account)| account.snapshot(index) > source.accumulator)
            {
                return Err(LedgerError::InvalidConfig(format!(
                    "snapshot {} of {holder} is ahead of profit source #{index} ({})",
                    account.snapshot(index),
                    source.accumulator
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// ProfitLedger
// ============================================================================

/// Multi-source profit-distribution ledger.
///
/// `T` gives access to the payout tokens, `G` decides who may mint and
/// whether a holder may move shares.
#[derive(Debug)]
pub struct ProfitLedger<T, G = AdminGate> {
    pub(crate) state: LedgerState,
    pub(crate) tokens: T,
    pub(crate) gate: G,
    pub(crate) scale: Scale,
    pub(crate) precision: PrecisionGuard,
    pub(crate) events: Vec<LedgerEvent>,
}

impl<T: TokenLedger> ProfitLedger<T, AdminGate> {
    /// Creates an empty ledger at `address` where only `admin` may mint.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` if `config` is invalid.
    pub fn new(address: Address, admin: Address, tokens: T, config: &LedgerConfig) -> LedgerResult<Self> {
        Self::with_gatekeeper(address, admin, tokens, AdminGate, config)
    }
}

impl<T: TokenLedger, G: Gatekeeper> ProfitLedger<T, G> {
    /// Creates an empty ledger with a custom mint/transfer collaborator.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` if `config` is invalid.
    pub fn with_gatekeeper(
        address: Address,
        admin: Address,
        tokens: T,
        gate: G,
        config: &LedgerConfig,
    ) -> LedgerResult<Self> {
        Self::from_state(LedgerState::new(address, admin), tokens, gate, config)
    }

    /// Restores a ledger from a saved state.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` if `config` is invalid or the
    /// state's supply counters are inconsistent.
    pub fn from_state(state: LedgerState, tokens: T, gate: G, config: &LedgerConfig) -> LedgerResult<Self> {
        let scale = config.validate()?;
        state.verify(scale)?;
        tracing::info!(
            "Ledger {} ready (scale {}, precision guard {}, {} sources)",
            state.address,
            scale,
            if config.precision_guard { "on" } else { "off" },
            state.registry.len()
        );
        Ok(Self {
            state,
            tokens,
            gate,
            scale,
            precision: PrecisionGuard::new(scale, config.precision_guard),
            events: Vec::with_capacity(64),
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The full ledger state.
    #[must_use]
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// The ledger's own address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.state.address
    }

    /// The current admin.
    #[must_use]
    pub fn admin(&self) -> Address {
        self.state.admin.holder()
    }

    /// The accumulator scale.
    #[must_use]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// The payout token collaborator.
    #[must_use]
    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// Mutable access to the payout tokens, e.g. to deposit profit.
    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }

    /// The mint/transfer collaborator.
    #[must_use]
    pub fn gatekeeper(&self) -> &G {
        &self.gate
    }

    /// Mutable access to the mint/transfer collaborator.
    pub fn gatekeeper_mut(&mut self) -> &mut G {
        &mut self.gate
    }

    /// Drains all events committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of undrained events.
    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    // ------------------------------------------------------------------------
    // Share reads
    // ------------------------------------------------------------------------

    /// Share balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.state
            .accounts
            .get(&account)
            .map_or(U256::ZERO, Account::balance)
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.state.supply.total()
    }

    /// Sum of excluded balances.
    #[must_use]
    pub fn excluded_supply(&self) -> U256 {
        self.state.supply.excluded()
    }

    /// The profit-sharing denominator.
    #[must_use]
    pub fn effective_supply(&self) -> U256 {
        self.state.supply.effective()
    }

    /// True if `account` is excluded from profits.
    #[must_use]
    pub fn is_excluded(&self, account: Address) -> bool {
        self.state
            .accounts
            .get(&account)
            .is_some_and(Account::is_excluded)
    }

    /// Remaining amount `spender` may move on behalf of `owner`.
    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.state
            .allowances
            .get(&owner)
            .and_then(|spenders| spenders.get(&spender))
            .copied()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Profit reads
    // ------------------------------------------------------------------------

    /// Number of registered profit sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.state.registry.len()
    }

    /// True once profit source membership is frozen.
    #[must_use]
    pub fn sources_finalized(&self) -> bool {
        self.state.registry.is_finalized()
    }

    /// The committed record of source `index`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownSource` for an unregistered index.
    pub fn profit_source(&self, index: usize) -> LedgerResult<&ProfitSource> {
        self.state.registry.get(index)
    }

    /// Profit `account` could withdraw from source `index` right now,
    /// including deposits not yet synced. Writes nothing.
    ///
    /// # Errors
    ///
    /// `LedgerError::UnknownSource` for an unregistered index, or a token or
    /// arithmetic error from the hypothetical sync.
    pub fn balance_of_profit(&self, account: Address, index: usize) -> LedgerResult<U256> {
        let synced = self.stage_sync(index)?;
        match self.state.accounts.get(&account) {
            Some(record) => record.pending(index, synced.source.accumulator, self.scale),
            None => Ok(U256::ZERO),
        }
    }

    /// Profit already settled to `account` for source `index`, ignoring
    /// anything accrued since its last settle.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownSource` for an unregistered index.
    pub fn settled_profit(&self, account: Address, index: usize) -> LedgerResult<U256> {
        self.state.registry.get(index)?;
        Ok(self
            .state
            .accounts
            .get(&account)
            .map_or(U256::ZERO, |record| record.settled(index)))
    }

    // ------------------------------------------------------------------------
    // Share mutations
    // ------------------------------------------------------------------------

    /// Mints `amount` new shares to `to`, as requested by `caller`.
    ///
    /// # Errors
    ///
    /// - `ArithmeticError` if the new total supply passes the ceiling
    /// - `PrecisionError` for a sub-quantum amount
    /// - a `Policy` error from the mint collaborator
    pub fn mint(&mut self, caller: Address, to: Address, amount: U256) -> LedgerResult<()> {
        self.scale.ensure_representable(amount)?;
        let mut receiver = self.account_or_default(to);
        let supply = self.state.supply.after_mint(amount, receiver.is_excluded())?;
        self.scale.ensure_representable(supply.total())?;
        self.check_precision(amount)?;

        let synced = self.stage_sync_all()?;
        receiver.settle_all(&sources_of(&synced), self.scale)?;
        receiver.credit(amount)?;

        self.gate.authorize_mint(self.state.admin, caller, to, amount)?;

        self.commit_synced(&synced);
        self.state.accounts.insert(to, receiver);
        self.state.supply = supply;
        self.events.push(LedgerEvent::Transfer {
            from: Address::ZERO,
            to,
            amount,
        });
        tracing::debug!("Minted {} shares to {} (supply {})", amount, to, supply.total());
        Ok(())
    }

    /// Moves `amount` of `caller`'s shares to `to`.
    ///
    /// # Errors
    ///
    /// - `InsufficientBalance` if `caller` holds less than `amount`
    /// - `PrecisionError` for a sub-quantum amount
    /// - `ArithmeticError` if `amount` passes the supply ceiling
    /// - a `Policy` error from the transfer collaborator
    pub fn transfer(&mut self, caller: Address, to: Address, amount: U256) -> LedgerResult<()> {
        self.move_shares(caller, to, amount)
    }

    /// Sets the amount `spender` may move on behalf of `owner`.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.write_allowance(owner, spender, amount);
        self.events.push(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
        tracing::debug!("{} approved {} for {} shares", owner, spender, amount);
    }

    /// Moves `amount` of `from`'s shares to `to` using `spender`'s allowance.
    /// An allowance of `U256::MAX` is never decremented.
    ///
    /// # Errors
    ///
    /// `InsufficientAllowance`, then anything [`Self::transfer`] returns.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<()> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from,
                spender,
                requested: amount,
                available: allowed,
            });
        }
        self.move_shares(from, to, amount)?;
        if allowed != U256::MAX {
            self.write_allowance(from, spender, allowed - amount);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------------

    /// Appends `token` as a new profit source and returns its index.
    ///
    /// The ledger's current balance in `token` is probed, so a handle that is
    /// not a token fails here rather than on the next transfer.
    ///
    /// # Errors
    ///
    /// `NotAuthorized`, `SourcesFinalized`, `AlreadyRegistered`, or the
    /// token error from the probe.
    pub fn register_profit_source(&mut self, caller: Address, token: Address) -> LedgerResult<usize> {
        self.state.admin.authorize(caller)?;
        self.state.registry.ensure_registrable(&token)?;
        let resident = self.tokens.balance_of(token, self.state.address)?;

        let index = self.state.registry.register(token)?;
        self.events.push(LedgerEvent::ProfitSourceRegistered { index, token });
        tracing::info!(
            "Registered profit source #{}: {} ({} already in pool)",
            index,
            token,
            resident
        );
        Ok(index)
    }

    /// Freezes profit source membership. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` for anyone but the admin.
    pub fn finalize_profit_sources(&mut self, caller: Address) -> LedgerResult<()> {
        self.state.admin.authorize(caller)?;
        if self.state.registry.finalize() {
            self.events.push(LedgerEvent::ProfitSourcesFinalized);
            tracing::info!("Profit sources finalized at {}", self.state.registry.len());
        }
        Ok(())
    }

    /// Hands the admin capability to `new_admin`.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` for anyone but the admin.
    pub fn transfer_admin(&mut self, caller: Address, new_admin: Address) -> LedgerResult<()> {
        self.state.admin.authorize(caller)?;
        self.state.admin = AdminRole::new(new_admin);
        self.events.push(LedgerEvent::AdminChanged {
            previous: caller,
            current: new_admin,
        });
        tracing::info!("Admin changed: {} -> {}", caller, new_admin);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn move_shares(&mut self, from: Address, to: Address, amount: U256) -> LedgerResult<()> {
        self.scale.ensure_representable(amount)?;
        let mut sender = self.account_or_default(from);
        if sender.balance() < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                requested: amount,
                available: sender.balance(),
            });
        }
        self.check_precision(amount)?;
        self.gate.check_transfer(from, sender.balance(), amount)?;

        let synced = self.stage_sync_all()?;
        let sources = sources_of(&synced);
        sender.settle_all(&sources, self.scale)?;

        let mut supply = self.state.supply;
        let mut receiver = None;
        if from != to {
            let mut credited = self.account_or_default(to);
            credited.settle_all(&sources, self.scale)?;
            supply = supply.after_transfer(amount, sender.is_excluded(), credited.is_excluded())?;
            sender.debit(amount)?;
            credited.credit(amount)?;
            receiver = Some(credited);
        }

        self.commit_synced(&synced);
        self.state.accounts.insert(from, sender);
        if let Some(credited) = receiver {
            self.state.accounts.insert(to, credited);
        }
        self.state.supply = supply;
        self.events.push(LedgerEvent::Transfer { from, to, amount });
        tracing::debug!("Transferred {} shares {} -> {}", amount, from, to);
        Ok(())
    }

    pub(crate) fn check_precision(&self, amount: U256) -> LedgerResult<()> {
        self.precision.check(
            amount,
            self.state.supply.effective(),
            !self.state.registry.is_empty(),
        )
    }

    pub(crate) fn account_or_default(&self, account: Address) -> Account {
        self.state.accounts.get(&account).cloned().unwrap_or_default()
    }

    /// Syncs one source into a staged copy.
    pub(crate) fn stage_sync(&self, index: usize) -> LedgerResult<Synced> {
        let source = self.state.registry.get(index)?;
        let pool_now = self.tokens.balance_of(source.token, self.state.address)?;
        accumulator::sync(source, pool_now, self.state.supply.effective(), self.scale)
    }

    /// Syncs every source into staged copies, in registration order.
    pub(crate) fn stage_sync_all(&self) -> LedgerResult<Vec<Synced>> {
        (0..self.state.registry.len())
            .map(|index| self.stage_sync(index))
            .collect()
    }

    pub(crate) fn commit_synced(&mut self, synced: &[Synced]) {
        for (index, staged) in synced.iter().enumerate() {
            self.commit_source(index, staged);
        }
    }

    pub(crate) fn commit_source(&mut self, index: usize, staged: &Synced) {
        if !staged.deposited.is_zero() {
            if staged.attributed {
                tracing::debug!(
                    "Profit source #{} accrued {} (accumulator {})",
                    index,
                    staged.deposited,
                    staged.source.accumulator
                );
            } else {
                tracing::warn!(
                    "Profit source #{}: {} deposited while no shares participate, left unattributed",
                    index,
                    staged.deposited
                );
            }
        }
        self.state.registry.commit(index, staged.source);
    }

    fn write_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        if amount.is_zero() {
            if let Some(spenders) = self.state.allowances.get_mut(&owner) {
                spenders.remove(&spender);
                if spenders.is_empty() {
                    self.state.allowances.remove(&owner);
                }
            }
        } else {
            self.state
                .allowances
                .entry(owner)
                .or_default()
                .insert(spender, amount);
        }
    }
}

fn sources_of(synced: &[Synced]) -> Vec<ProfitSource> {
    synced.iter().map(|staged| staged.source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenBook;

    const LEDGER: Address = Address::repeat_byte(0xEE);
    const ADMIN: Address = Address::repeat_byte(0x01);
    const ALICE: Address = Address::repeat_byte(0x02);
    const BOB: Address = Address::repeat_byte(0x03);
    const FIAT: Address = Address::repeat_byte(0xF1);

    fn setup() -> ProfitLedger<TokenBook> {
        let mut book = TokenBook::new();
        book.deploy(FIAT, ADMIN, U256::from(1_000_000u64)).unwrap();
        let mut ledger = ProfitLedger::new(LEDGER, ADMIN, book, &LedgerConfig::default()).unwrap();
        ledger.mint(ADMIN, ADMIN, U256::from(1000)).unwrap();
        ledger.register_profit_source(ADMIN, FIAT).unwrap();
        ledger
    }

    fn deposit(ledger: &mut ProfitLedger<TokenBook>, amount: u64) {
        ledger
            .tokens_mut()
            .transfer(FIAT, ADMIN, LEDGER, U256::from(amount))
            .unwrap();
    }

    #[test]
    fn test_mint_and_transfer() {
        let mut ledger = setup();
        ledger.transfer(ADMIN, ALICE, U256::from(300)).unwrap();

        assert_eq!(ledger.balance_of(ADMIN), U256::from(700));
        assert_eq!(ledger.balance_of(ALICE), U256::from(300));
        assert_eq!(ledger.total_supply(), U256::from(1000));
    }

    #[test]
    fn test_insufficient_balance() {
        let mut ledger = setup();
        let err = ledger.transfer(ALICE, BOB, U256::from(1)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                account: ALICE,
                requested: U256::from(1),
                available: U256::ZERO
            }
        );
    }

    #[test]
    fn test_non_admin_cannot_mint() {
        let mut ledger = setup();
        let err = ledger.mint(ALICE, ALICE, U256::from(5)).unwrap_err();
        assert!(matches!(err, LedgerError::Policy(_)));
        assert_eq!(ledger.total_supply(), U256::from(1000));
    }

    #[test]
    fn test_profit_is_proportional() {
        let mut ledger = setup();
        ledger.transfer(ADMIN, ALICE, U256::from(100)).unwrap();
        ledger.transfer(ADMIN, BOB, U256::from(200)).unwrap();
        deposit(&mut ledger, 10);

        assert_eq!(ledger.balance_of_profit(ADMIN, 0), Ok(U256::from(7)));
        assert_eq!(ledger.balance_of_profit(ALICE, 0), Ok(U256::from(1)));
        assert_eq!(ledger.balance_of_profit(BOB, 0), Ok(U256::from(2)));
        // reads never sync
        assert_eq!(ledger.profit_source(0).unwrap().accumulator, U256::ZERO);
    }

    #[test]
    fn test_self_transfer_settles_only() {
        let mut ledger = setup();
        deposit(&mut ledger, 10);
        ledger.transfer(ADMIN, ADMIN, U256::from(400)).unwrap();

        assert_eq!(ledger.balance_of(ADMIN), U256::from(1000));
        assert_eq!(ledger.settled_profit(ADMIN, 0), Ok(U256::from(10)));
    }

    #[test]
    fn test_transfer_from_uses_allowance() {
        let mut ledger = setup();
        ledger.approve(ADMIN, ALICE, U256::from(50));

        let err = ledger.transfer_from(ALICE, ADMIN, BOB, U256::from(51)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));

        ledger.transfer_from(ALICE, ADMIN, BOB, U256::from(30)).unwrap();
        assert_eq!(ledger.balance_of(BOB), U256::from(30));
        assert_eq!(ledger.allowance(ADMIN, ALICE), U256::from(20));
    }

    #[test]
    fn test_unlimited_allowance_is_kept() {
        let mut ledger = setup();
        ledger.approve(ADMIN, ALICE, U256::MAX);
        ledger.transfer_from(ALICE, ADMIN, BOB, U256::from(30)).unwrap();
        assert_eq!(ledger.allowance(ADMIN, ALICE), U256::MAX);
    }

    #[test]
    fn test_failed_transfer_from_keeps_allowance() {
        let mut ledger = setup();
        ledger.approve(BOB, ALICE, U256::from(50));
        assert!(ledger.transfer_from(ALICE, BOB, ADMIN, U256::from(10)).is_err());
        assert_eq!(ledger.allowance(BOB, ALICE), U256::from(50));
    }

    #[test]
    fn test_transfer_admin() {
        let mut ledger = setup();
        ledger.transfer_admin(ADMIN, ALICE).unwrap();
        assert_eq!(ledger.admin(), ALICE);
        assert_eq!(
            ledger.finalize_profit_sources(ADMIN),
            Err(LedgerError::NotAuthorized { caller: ADMIN })
        );
        ledger.finalize_profit_sources(ALICE).unwrap();
        assert!(ledger.sources_finalized());
    }

    #[test]
    fn test_events_buffered_on_success_only() {
        let mut ledger = setup();
        ledger.drain_events();

        ledger.transfer(ADMIN, ALICE, U256::from(5)).unwrap();
        let _ = ledger.transfer(ALICE, BOB, U256::from(6));

        assert_eq!(
            ledger.drain_events(),
            vec![LedgerEvent::Transfer {
                from: ADMIN,
                to: ALICE,
                amount: U256::from(5)
            }]
        );
        assert_eq!(ledger.pending_event_count(), 0);
    }

    #[test]
    fn test_state_round_trip_restores() {
        let mut ledger = setup();
        ledger.transfer(ADMIN, ALICE, U256::from(250)).unwrap();
        let state = ledger.state().clone();
        let tokens = ledger.tokens().clone();

        let restored = ProfitLedger::from_state(state, tokens, AdminGate, &LedgerConfig::default()).unwrap();
        assert_eq!(restored.balance_of(ALICE), U256::from(250));
        assert_eq!(restored.source_count(), 1);
    }

    #[test]
    fn test_restore_rejects_snapshot_ahead_of_source() {
        let mut ledger = setup();
        deposit(&mut ledger, 10);
        ledger.transfer(ADMIN, ALICE, U256::from(250)).unwrap();

        let mut state = ledger.state().clone();
        let source = *state.registry.get(0).unwrap();
        state.registry.commit(
            0,
            ProfitSource {
                accumulator: U256::ZERO,
                ..source
            },
        );

        let err = ProfitLedger::from_state(state, ledger.tokens().clone(), AdminGate, &LedgerConfig::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn test_restore_rejects_paid_out_above_observed() {
        let mut ledger = setup();
        deposit(&mut ledger, 10);
        ledger.withdraw_profit(ADMIN, U256::from(4), 0).unwrap();

        let mut state = ledger.state().clone();
        let source = *state.registry.get(0).unwrap();
        assert!(source.paid_out <= source.last_observed);
        state.registry.commit(
            0,
            ProfitSource {
                paid_out: source.last_observed + U256::from(1),
                ..source
            },
        );

        let err = ProfitLedger::from_state(state, ledger.tokens().clone(), AdminGate, &LedgerConfig::default())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }
}
