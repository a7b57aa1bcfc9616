//! Chain boundary errors.

use alloy_primitives::B256;
use thiserror::Error;

/// Errors raised while encoding or parsing EVM logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The log's first topic is not a known event signature.
    #[error("unknown event signature {0}")]
    UnknownEvent(B256),

    /// The log has no topics at all (anonymous event).
    #[error("log has no signature topic")]
    Anonymous,

    /// The log matched a signature but its layout is wrong.
    #[error("malformed {event} log: {reason}")]
    MalformedLog {
        /// The event the log claims to be.
        event: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
