//! # Ledger Configuration
//!
//! The accounting policy constants, loaded once at startup from TOML.
//!
//! ```toml
//! scale_decimals = 18
//! precision_guard = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arithmetic::{Scale, DEFAULT_SCALE_DECIMALS};
use crate::error::{LedgerError, LedgerResult};

/// Policy constants for a ledger instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Decimal places of the accumulator scale (`SCALE = 10^scale_decimals`).
    pub scale_decimals: u32,
    /// Reject movements below the quantum while a profit source exists.
    pub precision_guard: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            scale_decimals: DEFAULT_SCALE_DECIMALS,
            precision_guard: true,
        }
    }
}

impl LedgerConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` on malformed TOML or out-of-range
    /// values.
    pub fn from_toml_str(text: &str) -> LedgerResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| LedgerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` if the file cannot be read or is
    /// invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks the values and returns the derived accumulator scale.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` if `scale_decimals` is out of range.
    pub fn validate(&self) -> LedgerResult<Scale> {
        Scale::from_decimals(self.scale_decimals)
    }
}
