//! # Deposit Watcher
//!
//! Profit arrives as plain ERC-20 transfers to the ledger's address; nothing
//! on the ledger itself is called. The watcher classifies those transfers
//! for indexers and operators: a transfer of a registered source token is
//! profit, anything else is stray and recoverable by the admin.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use profitshare_ledger::{Gatekeeper, ProfitLedger, TokenLedger};

use crate::error::ChainResult;
use crate::events::{Erc20Transfer, EventParser, LogRecord};

/// How a deposit is treated by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepositKind {
    /// Profit for the source at `index`.
    Profit {
        /// Source index.
        index: usize,
    },
    /// A token that is not a profit source.
    Stray,
}

/// One incoming transfer to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositNotice {
    /// The deposited token.
    pub token: Address,
    /// The sender.
    pub from: Address,
    /// Amount received.
    pub amount: U256,
    /// Profit or stray.
    pub kind: DepositKind,
}

/// Classifies token transfers into the ledger.
#[derive(Clone, Debug)]
pub struct DepositWatcher {
    ledger: Address,
    sources: HashMap<Address, usize>,
    totals: HashMap<Address, U256>,
}

impl DepositWatcher {
    /// Watcher for the ledger at `ledger` with no known sources.
    #[must_use]
    pub fn new(ledger: Address) -> Self {
        Self {
            ledger,
            sources: HashMap::new(),
            totals: HashMap::new(),
        }
    }

    /// Watcher that knows every source currently registered on `ledger`.
    #[must_use]
    pub fn for_ledger<T: TokenLedger, G: Gatekeeper>(ledger: &ProfitLedger<T, G>) -> Self {
        let mut watcher = Self::new(ledger.address());
        for (index, source) in ledger.state().registry().as_slice().iter().enumerate() {
            watcher.track_source(index, source.token);
        }
        watcher
    }

    /// Records that `token` is the source at `index`.
    pub fn track_source(&mut self, index: usize, token: Address) {
        self.sources.insert(token, index);
    }

    /// Classifies one transfer. Returns `None` unless it credits the ledger
    /// from someone else.
    pub fn observe(&mut self, transfer: &Erc20Transfer) -> Option<DepositNotice> {
        if transfer.to != self.ledger || transfer.from == self.ledger {
            return None;
        }

        let kind = match self.sources.get(&transfer.token) {
            Some(&index) => DepositKind::Profit { index },
            None => {
                tracing::warn!(
                    "Stray deposit of {} in {} from {}",
                    transfer.value,
                    transfer.token,
                    transfer.from
                );
                DepositKind::Stray
            }
        };

        let total = self.totals.entry(transfer.token).or_default();
        *total = total.saturating_add(transfer.value);

        if let DepositKind::Profit { index } = kind {
            tracing::debug!("Profit deposit of {} to source {}", transfer.value, index);
        }

        Some(DepositNotice {
            token: transfer.token,
            from: transfer.from,
            amount: transfer.value,
            kind,
        })
    }

    /// Parses a raw log and classifies it.
    ///
    /// # Errors
    ///
    /// Returns a `ChainError` if the log is not an ERC-20 `Transfer`.
    pub fn observe_log(&mut self, log: &LogRecord) -> ChainResult<Option<DepositNotice>> {
        let transfer = EventParser::parse_erc20_transfer(log)?;
        Ok(self.observe(&transfer))
    }

    /// Classifies a batch of logs, skipping anything that is not an ERC-20
    /// `Transfer`.
    pub fn observe_all(&mut self, logs: &[LogRecord]) -> Vec<DepositNotice> {
        logs.iter()
            .filter_map(|log| match self.observe_log(log) {
                Ok(notice) => notice,
                Err(e) => {
                    tracing::trace!("Skipping log from {}: {}", log.address, e);
                    None
                }
            })
            .collect()
    }

    /// Everything received in `token` so far, saturating.
    #[must_use]
    pub fn total_deposited(&self, token: &Address) -> U256 {
        self.totals.get(token).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogEncoder;
    use profitshare_ledger::{LedgerConfig, TokenBook, TokenTransfer};

    const LEDGER: Address = Address::repeat_byte(0xEE);
    const ADMIN: Address = Address::repeat_byte(0x01);
    const FIAT: Address = Address::repeat_byte(0xF0);
    const STRAY: Address = Address::repeat_byte(0xF9);

    fn transfer(token: Address, from: Address, to: Address, value: u64) -> Erc20Transfer {
        Erc20Transfer {
            token,
            from,
            to,
            value: U256::from(value),
        }
    }

    #[test]
    fn test_classifies_profit_and_stray() {
        let mut watcher = DepositWatcher::new(LEDGER);
        watcher.track_source(0, FIAT);

        let profit = watcher.observe(&transfer(FIAT, ADMIN, LEDGER, 10)).unwrap();
        assert_eq!(profit.kind, DepositKind::Profit { index: 0 });

        let stray = watcher.observe(&transfer(STRAY, ADMIN, LEDGER, 3)).unwrap();
        assert_eq!(stray.kind, DepositKind::Stray);

        assert_eq!(watcher.total_deposited(&FIAT), U256::from(10));
        assert_eq!(watcher.total_deposited(&STRAY), U256::from(3));
    }

    #[test]
    fn test_ignores_payouts_and_unrelated() {
        let mut watcher = DepositWatcher::new(LEDGER);
        watcher.track_source(0, FIAT);

        assert!(watcher.observe(&transfer(FIAT, LEDGER, ADMIN, 5)).is_none());
        assert!(watcher.observe(&transfer(FIAT, ADMIN, Address::repeat_byte(2), 5)).is_none());
        assert_eq!(watcher.total_deposited(&FIAT), U256::ZERO);
    }

    #[test]
    fn test_for_ledger_tracks_registered_sources() {
        let mut book = TokenBook::new();
        book.deploy(FIAT, ADMIN, U256::from(1000)).unwrap();
        let mut ledger = ProfitLedger::new(LEDGER, ADMIN, book, &LedgerConfig::default()).unwrap();
        ledger.register_profit_source(ADMIN, FIAT).unwrap();
        ledger.tokens_mut().transfer(FIAT, ADMIN, LEDGER, U256::from(10)).unwrap();

        let mut watcher = DepositWatcher::for_ledger(&ledger);
        let logs: Vec<LogRecord> = ledger
            .tokens_mut()
            .drain_transfers()
            .iter()
            .map(LogEncoder::token_transfer)
            .collect();
        let notices = watcher.observe_all(&logs);

        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0],
            DepositNotice {
                token: FIAT,
                from: ADMIN,
                amount: U256::from(10),
                kind: DepositKind::Profit { index: 0 },
            }
        );
    }

    #[test]
    fn test_observe_log_rejects_non_transfer() {
        let mut watcher = DepositWatcher::new(LEDGER);
        let log = LogEncoder::new(LEDGER).encode(&profitshare_ledger::LedgerEvent::ProfitSourcesFinalized);
        assert!(watcher.observe_log(&log).is_err());

        let ok = LogEncoder::token_transfer(&TokenTransfer {
            token: STRAY,
            from: ADMIN,
            to: LEDGER,
            amount: U256::from(1),
        });
        assert!(watcher.observe_log(&ok).unwrap().is_some());
    }
}
