//! # EVM Logs
//!
//! Ledger events out, token transfers in.
//!
//! Encoding follows the Solidity log layout: topic 0 is the event signature
//! hash, indexed fields follow as 32-byte topics, and the remaining fields
//! are ABI-encoded words in `data`. Parsing reads straight from those words
//! without an intermediate decoder.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use profitshare_ledger::{LedgerEvent, TokenTransfer};

use crate::contracts::{IProfitDistributor, IERC20};
use crate::error::{ChainError, ChainResult};

/// One EVM log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// The emitting contract.
    pub address: Address,
    /// Signature hash followed by indexed fields.
    pub topics: Vec<B256>,
    /// Non-indexed fields, 32 bytes each.
    pub data: Vec<u8>,
}

impl LogRecord {
    /// The event signature hash, if the log is not anonymous.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

// ============================================================================
// Word helpers
// ============================================================================

#[inline]
fn address_word(address: Address) -> B256 {
    address.into_word()
}

#[inline]
fn amount_word(amount: U256) -> B256 {
    B256::from(amount.to_be_bytes::<32>())
}

#[inline]
fn index_word(index: usize) -> B256 {
    amount_word(U256::from(index))
}

fn data_of(words: &[B256]) -> Vec<u8> {
    let mut data = Vec::with_capacity(words.len() * 32);
    for word in words {
        data.extend_from_slice(word.as_slice());
    }
    data
}

/// Reads typed fields out of a log whose signature already matched.
struct FieldReader<'a> {
    log: &'a LogRecord,
    event: &'static str,
}

impl<'a> FieldReader<'a> {
    fn new(log: &'a LogRecord, event: &'static str, topics: usize, words: usize) -> ChainResult<Self> {
        if log.topics.len() != topics {
            return Err(ChainError::MalformedLog {
                event,
                reason: "wrong number of topics",
            });
        }
        if log.data.len() != words * 32 {
            return Err(ChainError::MalformedLog {
                event,
                reason: "wrong data length",
            });
        }
        Ok(Self { log, event })
    }

    fn topic(&self, n: usize) -> B256 {
        self.log.topics[n]
    }

    fn word(&self, n: usize) -> B256 {
        B256::from_slice(&self.log.data[n * 32..(n + 1) * 32])
    }

    fn address(&self, word: B256) -> ChainResult<Address> {
        if word[..12].iter().any(|byte| *byte != 0) {
            return Err(ChainError::MalformedLog {
                event: self.event,
                reason: "address word has dirty upper bytes",
            });
        }
        Ok(Address::from_slice(&word[12..]))
    }

    fn amount(word: B256) -> U256 {
        U256::from_be_bytes(word.0)
    }

    fn index(&self, word: B256) -> ChainResult<usize> {
        let value = Self::amount(word);
        let limbs = value.as_limbs();
        let too_large = ChainError::MalformedLog {
            event: self.event,
            reason: "source index does not fit in usize",
        };
        if limbs[1..].iter().any(|limb| *limb != 0) {
            return Err(too_large);
        }
        usize::try_from(limbs[0]).map_err(|_| too_large)
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Turns ledger events into logs emitted by the ledger contract.
#[derive(Clone, Copy, Debug)]
pub struct LogEncoder {
    ledger: Address,
}

impl LogEncoder {
    /// Encoder for the ledger living at `ledger`.
    #[must_use]
    pub const fn new(ledger: Address) -> Self {
        Self { ledger }
    }

    /// Encodes one event.
    #[must_use]
    pub fn encode(&self, event: &LedgerEvent) -> LogRecord {
        let (topics, data) = match *event {
            LedgerEvent::Transfer { from, to, amount } => (
                vec![
                    IProfitDistributor::Transfer::SIGNATURE_HASH,
                    address_word(from),
                    address_word(to),
                ],
                data_of(&[amount_word(amount)]),
            ),
            LedgerEvent::Approval {
                owner,
                spender,
                amount,
            } => (
                vec![
                    IProfitDistributor::Approval::SIGNATURE_HASH,
                    address_word(owner),
                    address_word(spender),
                ],
                data_of(&[amount_word(amount)]),
            ),
            LedgerEvent::ProfitSourceRegistered { index, token } => (
                vec![
                    IProfitDistributor::ProfitSourceRegistered::SIGNATURE_HASH,
                    index_word(index),
                    address_word(token),
                ],
                Vec::new(),
            ),
            LedgerEvent::ProfitSourcesFinalized => (
                vec![IProfitDistributor::ProfitSourcesFinalized::SIGNATURE_HASH],
                Vec::new(),
            ),
            LedgerEvent::ExcludedFromProfits { account, balance } => (
                vec![
                    IProfitDistributor::ExcludedFromProfits::SIGNATURE_HASH,
                    address_word(account),
                ],
                data_of(&[amount_word(balance)]),
            ),
            LedgerEvent::ProfitWithdrawn {
                account,
                index,
                token,
                amount,
            } => (
                vec![
                    IProfitDistributor::ProfitWithdrawn::SIGNATURE_HASH,
                    address_word(account),
                    index_word(index),
                ],
                data_of(&[address_word(token), amount_word(amount)]),
            ),
            LedgerEvent::FundsRecovered { token, to, amount } => (
                vec![
                    IProfitDistributor::FundsRecovered::SIGNATURE_HASH,
                    address_word(token),
                    address_word(to),
                ],
                data_of(&[amount_word(amount)]),
            ),
            LedgerEvent::AdminChanged { previous, current } => (
                vec![
                    IProfitDistributor::AdminChanged::SIGNATURE_HASH,
                    address_word(previous),
                    address_word(current),
                ],
                Vec::new(),
            ),
        };
        LogRecord {
            address: self.ledger,
            topics,
            data,
        }
    }

    /// Encodes a batch of events in order.
    #[must_use]
    pub fn encode_all(&self, events: &[LedgerEvent]) -> Vec<LogRecord> {
        events.iter().map(|event| self.encode(event)).collect()
    }

    /// The ERC-20 `Transfer` log a payout token emits for `transfer`.
    #[must_use]
    pub fn token_transfer(transfer: &TokenTransfer) -> LogRecord {
        LogRecord {
            address: transfer.token,
            topics: vec![
                IERC20::Transfer::SIGNATURE_HASH,
                address_word(transfer.from),
                address_word(transfer.to),
            ],
            data: data_of(&[amount_word(transfer.amount)]),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// An ERC-20 `Transfer` read from a log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Erc20Transfer {
    /// The emitting token contract.
    pub token: Address,
    /// Debited holder.
    pub from: Address,
    /// Credited holder.
    pub to: Address,
    /// Amount moved.
    pub value: U256,
}

/// Event parser for raw logs.
pub struct EventParser;

impl EventParser {
    /// Parses an ERC-20 `Transfer` log.
    ///
    /// # Errors
    ///
    /// `UnknownEvent` for any other signature, `MalformedLog` if the layout
    /// is not the ERC-20 one (an ERC-721 transfer indexes a fourth topic).
    pub fn parse_erc20_transfer(log: &LogRecord) -> ChainResult<Erc20Transfer> {
        let signature = log.signature().ok_or(ChainError::Anonymous)?;
        if signature != IERC20::Transfer::SIGNATURE_HASH {
            return Err(ChainError::UnknownEvent(signature));
        }
        let reader = FieldReader::new(log, "Transfer", 3, 1)?;
        Ok(Erc20Transfer {
            token: log.address,
            from: reader.address(reader.topic(1))?,
            to: reader.address(reader.topic(2))?,
            value: FieldReader::amount(reader.word(0)),
        })
    }

    /// Parses a log emitted by the ledger back into a [`LedgerEvent`].
    ///
    /// # Errors
    ///
    /// `UnknownEvent` for a signature the ledger never emits, `MalformedLog`
    /// for a wrong layout.
    pub fn parse_ledger_event(log: &LogRecord) -> ChainResult<LedgerEvent> {
        let signature = log.signature().ok_or(ChainError::Anonymous)?;

        if signature == IProfitDistributor::Transfer::SIGNATURE_HASH {
            let r = FieldReader::new(log, "Transfer", 3, 1)?;
            return Ok(LedgerEvent::Transfer {
                from: r.address(r.topic(1))?,
                to: r.address(r.topic(2))?,
                amount: FieldReader::amount(r.word(0)),
            });
        }
        if signature == IProfitDistributor::Approval::SIGNATURE_HASH {
            let r = FieldReader::new(log, "Approval", 3, 1)?;
            return Ok(LedgerEvent::Approval {
                owner: r.address(r.topic(1))?,
                spender: r.address(r.topic(2))?,
                amount: FieldReader::amount(r.word(0)),
            });
        }
        if signature == IProfitDistributor::ProfitSourceRegistered::SIGNATURE_HASH {
            let r = FieldReader::new(log, "ProfitSourceRegistered", 3, 0)?;
            return Ok(LedgerEvent::ProfitSourceRegistered {
                index: r.index(r.topic(1))?,
                token: r.address(r.topic(2))?,
            });
        }
        if signature == IProfitDistributor::ProfitSourcesFinalized::SIGNATURE_HASH {
            FieldReader::new(log, "ProfitSourcesFinalized", 1, 0)?;
            return Ok(LedgerEvent::ProfitSourcesFinalized);
        }
        if signature == IProfitDistributor::ExcludedFromProfits::SIGNATURE_HASH {
            let r = FieldReader::new(log, "ExcludedFromProfits", 2, 1)?;
            return Ok(LedgerEvent::ExcludedFromProfits {
                account: r.address(r.topic(1))?,
                balance: FieldReader::amount(r.word(0)),
            });
        }
        if signature == IProfitDistributor::ProfitWithdrawn::SIGNATURE_HASH {
            let r = FieldReader::new(log, "ProfitWithdrawn", 3, 2)?;
            return Ok(LedgerEvent::ProfitWithdrawn {
                account: r.address(r.topic(1))?,
                index: r.index(r.topic(2))?,
                token: r.address(r.word(0))?,
                amount: FieldReader::amount(r.word(1)),
            });
        }
        if signature == IProfitDistributor::FundsRecovered::SIGNATURE_HASH {
            let r = FieldReader::new(log, "FundsRecovered", 3, 1)?;
            return Ok(LedgerEvent::FundsRecovered {
                token: r.address(r.topic(1))?,
                to: r.address(r.topic(2))?,
                amount: FieldReader::amount(r.word(0)),
            });
        }
        if signature == IProfitDistributor::AdminChanged::SIGNATURE_HASH {
            let r = FieldReader::new(log, "AdminChanged", 3, 0)?;
            return Ok(LedgerEvent::AdminChanged {
                previous: r.address(r.topic(1))?,
                current: r.address(r.topic(2))?,
            });
        }
        Err(ChainError::UnknownEvent(signature))
    }
}
