//! # Scenario Files
//!
//! A scenario is a TOML document describing a ledger, the payout tokens that
//! exist around it, and an ordered list of steps to replay:
//!
//! ```toml
//! name = "proportional split"
//! admin = "admin"
//!
//! [ledger]
//! scale_decimals = 18
//!
//! [accounts]
//! admin = "0x1010101010101010101010101010101010101010"
//! alice = "0x1111111111111111111111111111111111111111"
//!
//! [[tokens]]
//! name = "usdc"
//! address = "0xf0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0"
//! holder = "admin"
//! supply = "1_000e9"
//!
//! [[steps]]
//! op = "mint"
//! to = "alice"
//! amount = 700
//!
//! [[steps]]
//! op = "expect_error"
//! error = "not_authorized"
//! step = { op = "finalize", caller = "alice" }
//! ```
//!
//! Participants are referred to by name. `ledger` always names the ledger's
//! own address; a raw `0x` address is accepted anywhere a name is. Amounts
//! are TOML integers or decimal strings with optional `_` separators and a
//! power-of-ten suffix (`"10e9"`).

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use profitshare_ledger::LedgerConfig;
use serde::Deserialize;

use crate::error::{ScenarioError, ScenarioResult};
use crate::runner::ERROR_KINDS;

/// Where the ledger lives unless the scenario says otherwise.
pub const DEFAULT_LEDGER_ADDRESS: Address = Address::repeat_byte(0xEE);

/// The reserved participant name for the ledger's own address.
pub const LEDGER_NAME: &str = "ledger";

fn default_ledger_address() -> Address {
    DEFAULT_LEDGER_ADDRESS
}

// ============================================================================
// Document model
// ============================================================================

/// A parsed scenario file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Human-readable title.
    #[serde(default)]
    pub name: Option<String>,
    /// The participant holding the admin capability.
    pub admin: String,
    /// The ledger's address.
    #[serde(default = "default_ledger_address")]
    pub ledger_address: Address,
    /// Ledger policy constants.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Participant names.
    #[serde(default)]
    pub accounts: BTreeMap<String, Address>,
    /// Payout tokens deployed before the first step.
    #[serde(default)]
    pub tokens: Vec<TokenDeployment>,
    /// The steps, replayed in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// An ERC-20 token that exists when the scenario starts.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenDeployment {
    /// Name used by steps.
    pub name: String,
    /// Contract address.
    pub address: Address,
    /// Who receives the initial supply.
    pub holder: String,
    /// Initial supply.
    pub supply: Amount,
}

/// An amount as written in the file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// A TOML integer.
    Units(u64),
    /// A decimal string, possibly beyond 64 bits.
    Text(String),
}

impl Amount {
    /// The amount as a `U256`.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::InvalidAmount` for malformed or oversized text.
    pub fn to_u256(&self) -> ScenarioResult<U256> {
        match self {
            Self::Units(units) => Ok(U256::from(*units)),
            Self::Text(text) => parse_amount(text),
        }
    }
}

/// Parses `"1_000"`, `"10e9"` or any decimal up to `2^256 - 1`.
///
/// # Errors
///
/// Returns `ScenarioError::InvalidAmount` if the text is not a non-negative
/// integer or does not fit in 256 bits.
pub fn parse_amount(text: &str) -> ScenarioResult<U256> {
    let invalid = || ScenarioError::InvalidAmount(text.to_string());
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();

    let (digits, exponent) = match cleaned.split_once(|c: char| c == 'e' || c == 'E') {
        Some((digits, exponent)) => (digits, exponent.parse::<u32>().map_err(|_| invalid())?),
        None => (cleaned.as_str(), 0),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let mantissa = U256::from_str_radix(digits, 10).map_err(|_| invalid())?;
    let factor = U256::from(10u8)
        .checked_pow(U256::from(exponent))
        .ok_or_else(invalid)?;
    mantissa.checked_mul(factor).ok_or_else(invalid)
}

/// One replayed step. `caller` defaults to the admin where it appears.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Mint shares.
    Mint {
        /// Minter.
        caller: Option<String>,
        /// Recipient.
        to: String,
        /// Shares.
        amount: Amount,
    },
    /// Move shares.
    Transfer {
        /// Sender.
        from: String,
        /// Recipient.
        to: String,
        /// Shares.
        amount: Amount,
    },
    /// Set a share allowance.
    Approve {
        /// Balance owner.
        owner: String,
        /// Spender.
        spender: String,
        /// Allowance.
        amount: Amount,
    },
    /// Move shares using an allowance.
    TransferFrom {
        /// Spender.
        spender: String,
        /// Balance owner.
        from: String,
        /// Recipient.
        to: String,
        /// Shares.
        amount: Amount,
    },
    /// Send payout tokens to the ledger's address.
    Deposit {
        /// Payout token.
        token: String,
        /// Sender.
        from: String,
        /// Token amount.
        amount: Amount,
    },
    /// Register a profit source.
    Register {
        /// Admin.
        caller: Option<String>,
        /// Payout token.
        token: String,
    },
    /// Freeze the source list.
    Finalize {
        /// Admin.
        caller: Option<String>,
    },
    /// Exclude an account from profits.
    Exclude {
        /// Admin.
        caller: Option<String>,
        /// The excluded account.
        account: String,
    },
    /// Withdraw settled profit; everything owed when `amount` is absent.
    Withdraw {
        /// Holder.
        account: String,
        /// Source index.
        source: usize,
        /// Token amount.
        amount: Option<Amount>,
    },
    /// Recover stray tokens to the admin.
    Recover {
        /// Admin.
        caller: Option<String>,
        /// Stray token.
        token: String,
        /// Token amount.
        amount: Amount,
    },
    /// Hand the admin capability over.
    TransferAdmin {
        /// Current admin.
        caller: Option<String>,
        /// New admin.
        to: String,
    },
    /// Check `balance_of_profit`.
    ExpectProfit {
        /// Holder.
        account: String,
        /// Source index.
        source: usize,
        /// Expected profit.
        amount: Amount,
    },
    /// Check a share balance.
    ExpectBalance {
        /// Holder.
        account: String,
        /// Expected shares.
        amount: Amount,
    },
    /// Check a payout token balance.
    ExpectTokenBalance {
        /// Payout token.
        token: String,
        /// Holder.
        account: String,
        /// Expected token amount.
        amount: Amount,
    },
    /// Run `step` and require it to fail with the named error kind.
    ExpectError {
        /// Error kind, e.g. `insufficient_balance`.
        error: String,
        /// The step that must fail.
        step: Box<Step>,
    },
}

impl Step {
    /// The step's `op` value.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::Transfer { .. } => "transfer",
            Self::Approve { .. } => "approve",
            Self::TransferFrom { .. } => "transfer_from",
            Self::Deposit { .. } => "deposit",
            Self::Register { .. } => "register",
            Self::Finalize { .. } => "finalize",
            Self::Exclude { .. } => "exclude",
            Self::Withdraw { .. } => "withdraw",
            Self::Recover { .. } => "recover",
            Self::TransferAdmin { .. } => "transfer_admin",
            Self::ExpectProfit { .. } => "expect_profit",
            Self::ExpectBalance { .. } => "expect_balance",
            Self::ExpectTokenBalance { .. } => "expect_token_balance",
            Self::ExpectError { .. } => "expect_error",
        }
    }

    /// True for steps that only read.
    #[must_use]
    pub const fn is_expectation(&self) -> bool {
        matches!(
            self,
            Self::ExpectProfit { .. }
                | Self::ExpectBalance { .. }
                | Self::ExpectTokenBalance { .. }
                | Self::ExpectError { .. }
        )
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(3);
        match self {
            Self::Mint { caller, to, .. } | Self::TransferAdmin { caller, to } => {
                names.extend(caller.as_deref());
                names.push(to);
            }
            Self::Transfer { from, to, .. } => names.extend([from.as_str(), to.as_str()]),
            Self::Approve { owner, spender, .. } => names.extend([owner.as_str(), spender.as_str()]),
            Self::TransferFrom {
                spender, from, to, ..
            } => names.extend([spender.as_str(), from.as_str(), to.as_str()]),
            Self::Deposit { token, from, .. } => names.extend([token.as_str(), from.as_str()]),
            Self::Register { caller, token } | Self::Recover { caller, token, .. } => {
                names.extend(caller.as_deref());
                names.push(token);
            }
            Self::Finalize { caller } => names.extend(caller.as_deref()),
            Self::Exclude { caller, account } => {
                names.extend(caller.as_deref());
                names.push(account);
            }
            Self::Withdraw { account, .. }
            | Self::ExpectProfit { account, .. }
            | Self::ExpectBalance { account, .. } => names.push(account),
            Self::ExpectTokenBalance { token, account, .. } => {
                names.extend([token.as_str(), account.as_str()]);
            }
            Self::ExpectError { step, .. } => return step.names(),
        }
        names
    }

    fn amounts(&self) -> Vec<&Amount> {
        match self {
            Self::Mint { amount, .. }
            | Self::Transfer { amount, .. }
            | Self::Approve { amount, .. }
            | Self::TransferFrom { amount, .. }
            | Self::Deposit { amount, .. }
            | Self::Recover { amount, .. }
            | Self::ExpectProfit { amount, .. }
            | Self::ExpectBalance { amount, .. }
            | Self::ExpectTokenBalance { amount, .. } => vec![amount],
            Self::Withdraw { amount, .. } => amount.iter().collect(),
            Self::Register { .. } | Self::Finalize { .. } | Self::Exclude { .. } | Self::TransferAdmin { .. } => {
                Vec::new()
            }
            Self::ExpectError { step, .. } => step.amounts(),
        }
    }
}

// ============================================================================
// Name resolution
// ============================================================================

/// Maps participant and token names to addresses.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    names: HashMap<String, Address>,
}

impl Directory {
    fn insert(&mut self, name: &str, address: Address) -> ScenarioResult<()> {
        if self.names.insert(name.to_string(), address).is_some() {
            return Err(ScenarioError::Invalid(format!("name '{name}' is defined twice")));
        }
        Ok(())
    }

    /// Resolves a name or a raw `0x` address.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::UnknownName` for anything else.
    pub fn resolve(&self, name: &str) -> ScenarioResult<Address> {
        if let Some(address) = self.names.get(name) {
            return Ok(*address);
        }
        if name.starts_with("0x") {
            return Address::from_str(name).map_err(|_| ScenarioError::UnknownName(name.to_string()));
        }
        Err(ScenarioError::UnknownName(name.to_string()))
    }

    /// The name registered for `address`, if any.
    #[must_use]
    pub fn name_of(&self, address: &Address) -> Option<&str> {
        self.names
            .iter()
            .filter(|(_, a)| *a == address)
            .map(|(name, _)| name.as_str())
            .min()
    }
}

// ============================================================================
// Loading & validation
// ============================================================================

impl Scenario {
    /// Parses a scenario from TOML text. Does not validate names.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::Parse` on malformed documents.
    pub fn from_toml_str(text: &str) -> ScenarioResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a scenario file.
    ///
    /// # Errors
    ///
    /// `ScenarioError::Io` or `ScenarioError::Parse`.
    pub fn from_file(path: impl AsRef<Path>) -> ScenarioResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks the config, every name and every amount without running
    /// anything, and returns the resolved names.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> ScenarioResult<Directory> {
        self.ledger.validate()?;

        let mut directory = Directory::default();
        directory.insert(LEDGER_NAME, self.ledger_address)?;
        for (name, address) in &self.accounts {
            directory.insert(name, *address)?;
        }
        for token in &self.tokens {
            directory.insert(&token.name, token.address)?;
        }

        directory.resolve(&self.admin)?;
        for token in &self.tokens {
            directory.resolve(&token.holder)?;
            token.supply.to_u256()?;
        }

        for (i, step) in self.steps.iter().enumerate() {
            if let Step::ExpectError { error, step: inner } = step {
                if inner.is_expectation() {
                    return Err(ScenarioError::Invalid(format!(
                        "step {}: expect_error cannot wrap {}",
                        i + 1,
                        inner.name()
                    )));
                }
                if !ERROR_KINDS.contains(&error.as_str()) {
                    return Err(ScenarioError::Invalid(format!(
                        "step {}: unknown error kind '{error}'",
                        i + 1
                    )));
                }
            }
            for name in step.names() {
                directory.resolve(name)?;
            }
            for amount in step.amounts() {
                amount.to_u256()?;
            }
        }

        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        admin = "admin"

        [accounts]
        admin = "0x1010101010101010101010101010101010101010"
        alice = "0x1111111111111111111111111111111111111111"

        [[tokens]]
        name = "usdc"
        address = "0xf0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0"
        holder = "admin"
        supply = "1_000e9"

        [[steps]]
        op = "mint"
        to = "alice"
        amount = 700

        [[steps]]
        op = "withdraw"
        account = "alice"
        source = 0

        [[steps]]
        op = "expect_error"
        error = "not_authorized"
        step = { op = "finalize", caller = "alice" }
    "#;

    #[test]
    fn test_parse_minimal() {
        let scenario = Scenario::from_toml_str(MINIMAL).unwrap();
        assert_eq!(scenario.ledger_address, DEFAULT_LEDGER_ADDRESS);
        assert_eq!(scenario.ledger, LedgerConfig::default());
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(scenario.steps[1], Step::Withdraw { amount: None, .. }));

        let directory = scenario.validate().unwrap();
        assert_eq!(directory.resolve("ledger").unwrap(), DEFAULT_LEDGER_ADDRESS);
        assert_eq!(directory.resolve("alice").unwrap(), Address::repeat_byte(0x11));
        assert_eq!(directory.name_of(&Address::repeat_byte(0xF0)), Some("usdc"));
    }

    #[test]
    fn test_parse_amounts() {
        assert_eq!(parse_amount("1_000").unwrap(), U256::from(1000));
        assert_eq!(parse_amount("10e9").unwrap(), U256::from(10_000_000_000u64));
        assert_eq!(parse_amount("0").unwrap(), U256::ZERO);
        assert_eq!(
            parse_amount("115792089237316195423570985008687907853269984665640564039457584007913129639935").unwrap(),
            U256::MAX
        );

        for bad in ["", "-1", "1.5", "0x10", "1e", "1e100", "abc"] {
            assert!(parse_amount(bad).is_err(), "{bad} parsed");
        }
    }

    #[test]
    fn test_raw_address_resolves() {
        let directory = Directory::default();
        assert_eq!(
            directory.resolve("0x2222222222222222222222222222222222222222").unwrap(),
            Address::repeat_byte(0x22)
        );
        assert!(matches!(directory.resolve("mallory"), Err(ScenarioError::UnknownName(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_names() {
        let text = MINIMAL.replace("to = \"alice\"", "to = \"mallory\"");
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(scenario.validate(), Err(ScenarioError::UnknownName(name)) if name == "mallory"));
    }

    #[test]
    fn test_validate_rejects_unknown_error_kind() {
        let text = MINIMAL.replace("\"not_authorized\"", "\"oops\"");
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let text = MINIMAL.replace("name = \"usdc\"", "name = \"alice\"");
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(scenario.validate(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_ledger_config() {
        let text = format!("{MINIMAL}\n[ledger]\nscale_decimals = 99\n");
        let scenario = Scenario::from_toml_str(&text).unwrap();
        assert!(matches!(scenario.validate(), Err(ScenarioError::Ledger(_))));
    }

    #[test]
    fn test_unknown_op_is_parse_error() {
        let text = format!("{MINIMAL}\n[[steps]]\nop = \"burn\"\n");
        assert!(matches!(Scenario::from_toml_str(&text), Err(ScenarioError::Parse(_))));
    }
}
