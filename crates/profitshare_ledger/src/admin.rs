//! # Admin Capability
//!
//! Privileged operations compare the caller against the `AdminRole` carried
//! in the ledger state. There is exactly one admin at a time.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// The admin capability of a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminRole(Address);

impl AdminRole {
    /// Grants the admin capability to `holder`.
    #[inline]
    #[must_use]
    pub const fn new(holder: Address) -> Self {
        Self(holder)
    }

    /// Returns the current admin address.
    #[inline]
    #[must_use]
    pub const fn holder(self) -> Address {
        self.0
    }

    /// Returns true if `caller` holds the capability.
    #[inline]
    #[must_use]
    pub fn is_held_by(self, caller: Address) -> bool {
        self.0 == caller
    }

    /// Fails unless `caller` holds the capability.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotAuthorized` for any other caller.
    #[inline]
    pub fn authorize(self, caller: Address) -> LedgerResult<()> {
        if self.is_held_by(caller) {
            Ok(())
        } else {
            Err(LedgerError::NotAuthorized { caller })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize() {
        let admin = AdminRole::new(Address::repeat_byte(1));
        assert!(admin.authorize(Address::repeat_byte(1)).is_ok());
        assert_eq!(
            admin.authorize(Address::repeat_byte(2)),
            Err(LedgerError::NotAuthorized {
                caller: Address::repeat_byte(2)
            })
        );
    }
}
