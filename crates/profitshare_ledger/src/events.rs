//! # Ledger Events
//!
//! Every committed operation appends events to the ledger's buffer. Nothing is
//! appended for a failed operation. Callers drain the buffer after each
//! operation (the chain layer turns events into EVM logs).

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Something that happened to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Shares moved. `from` is the zero address for a mint.
    Transfer {
        /// Debited holder.
        from: Address,
        /// Credited holder.
        to: Address,
        /// Shares moved.
        amount: U256,
    },
    /// An allowance was set.
    Approval {
        /// Share owner.
        owner: Address,
        /// Approved spender.
        spender: Address,
        /// New allowance.
        amount: U256,
    },
    /// A payout token became a profit source.
    ProfitSourceRegistered {
        /// Index assigned to the source.
        index: usize,
        /// The payout token.
        token: Address,
    },
    /// Profit source membership was frozen.
    ProfitSourcesFinalized,
    /// An account stopped participating in profits.
    ExcludedFromProfits {
        /// The excluded account.
        account: Address,
        /// Its balance at exclusion time.
        balance: U256,
    },
    /// Settled profit was paid out.
    ProfitWithdrawn {
        /// The paid account.
        account: Address,
        /// Source index.
        index: usize,
        /// The payout token.
        token: Address,
        /// Amount paid.
        amount: U256,
    },
    /// Stray tokens were returned to the admin.
    FundsRecovered {
        /// The recovered token.
        token: Address,
        /// The admin that received them.
        to: Address,
        /// Amount recovered.
        amount: U256,
    },
    /// The admin capability moved.
    AdminChanged {
        /// Former admin.
        previous: Address,
        /// New admin.
        current: Address,
    },
}

impl LedgerEvent {
    /// Short event name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::Approval { .. } => "Approval",
            Self::ProfitSourceRegistered { .. } => "ProfitSourceRegistered",
            Self::ProfitSourcesFinalized => "ProfitSourcesFinalized",
            Self::ExcludedFromProfits { .. } => "ExcludedFromProfits",
            Self::ProfitWithdrawn { .. } => "ProfitWithdrawn",
            Self::FundsRecovered { .. } => "FundsRecovered",
            Self::AdminChanged { .. } => "AdminChanged",
        }
    }
}
