//! # PROFITSHARE Chain
//!
//! The EVM side of the ledger: Solidity ABIs, log encoding for every
//! [`LedgerEvent`](profitshare_ledger::LedgerEvent), and detection of profit
//! deposits from ERC-20 `Transfer` logs.
//!
//! ## Flow
//!
//! ```text
//! ProfitLedger::drain_events ──> LogEncoder ──> LogRecord (ledger logs)
//! TokenBook::drain_transfers ──> LogEncoder::token_transfer ──> LogRecord
//!                                                   │
//!                                                   ▼
//!                               DepositWatcher ──> DepositNotice
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod contracts;
pub mod deposits;
pub mod error;
pub mod events;

pub use contracts::{IProfitDistributor, IERC20};
pub use deposits::{DepositKind, DepositNotice, DepositWatcher};
pub use error::{ChainError, ChainResult};
pub use events::{Erc20Transfer, EventParser, LogEncoder, LogRecord};
