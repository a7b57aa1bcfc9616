//! # PROFITSHARE Ledger
//!
//! A share ledger whose holders passively accrue proportional claims on
//! deposits into any number of external payout tokens.
//!
//! ## Design Principles
//!
//! 1. **No distribute transaction** - deposits are discovered lazily, by
//!    comparing the pool balance with what was last observed
//! 2. **O(1) per operation** - one accumulator per source, one snapshot per
//!    account and source; holders are never iterated
//! 3. **Checked 256-bit arithmetic** - overflow aborts the operation
//! 4. **All-or-nothing** - every operation stages its writes and commits only
//!    on success
//!
//! ## Example
//!
//! ```rust,ignore
//! use profitshare_ledger::{LedgerConfig, ProfitLedger, TokenBook, TokenLedger};
//!
//! let mut ledger = ProfitLedger::new(ledger_addr, admin, TokenBook::new(), &LedgerConfig::default())?;
//! ledger.mint(admin, alice, U256::from(700))?;
//! ledger.register_profit_source(admin, usdc)?;
//!
//! // a deposit is just a token transfer to the ledger's address
//! ledger.tokens_mut().transfer(usdc, payer, ledger_addr, U256::from(10))?;
//!
//! let owed = ledger.balance_of_profit(alice, 0)?;
//! ledger.withdraw_profit(alice, owed, 0)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod accumulator;
pub mod account;
pub mod admin;
pub mod arithmetic;
pub mod config;
pub mod error;
pub mod events;
pub mod exclusion;
pub mod gate;
pub mod ledger;
pub mod precision;
pub mod registry;
pub mod tokens;
mod withdrawal;

pub use account::Account;
pub use admin::AdminRole;
pub use arithmetic::{SafeMath, Scale, DEFAULT_SCALE_DECIMALS, MAX_SCALE_DECIMALS};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use events::LedgerEvent;
pub use exclusion::SupplyBook;
pub use gate::{AdminGate, Gatekeeper, PolicyError};
pub use ledger::{LedgerState, ProfitLedger};
pub use precision::PrecisionGuard;
pub use registry::{ProfitSource, SourceRegistry};
pub use tokens::{TokenBook, TokenError, TokenLedger, TokenTransfer};

pub use alloy_primitives::{Address, U256};
