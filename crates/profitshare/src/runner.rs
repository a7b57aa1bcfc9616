//! # Scenario Runner
//!
//! Replays a [`Scenario`] against a fresh ledger and [`TokenBook`]. After
//! every step the ledger's events and the book's token transfers are
//! encoded as EVM logs, and transfers into the ledger are classified by a
//! [`DepositWatcher`].

use alloy_primitives::{Address, U256};
use profitshare_chain::{DepositNotice, DepositWatcher, Erc20Transfer, LogEncoder, LogRecord};
use profitshare_ledger::{
    LedgerError, LedgerResult, LedgerState, PolicyError, ProfitLedger, TokenBook, TokenError,
    TokenLedger,
};

use crate::error::{ScenarioError, ScenarioResult};
use crate::scenario::{Amount, Directory, Scenario, Step};

/// Every error kind an `expect_error` step may name.
pub const ERROR_KINDS: &[&str] = &[
    "not_authorized",
    "insufficient_balance",
    "insufficient_allowance",
    "insufficient_profit_balance",
    "precision_error",
    "arithmetic_error",
    "already_registered",
    "sources_finalized",
    "withdrawal_not_allowed",
    "unknown_source",
    "invalid_config",
    "mint_allowance_exceeded",
    "locked",
    "policy_rejected",
    "unknown_token",
    "already_deployed",
    "insufficient_funds",
    "token_overflow",
    "token_rejected",
];

/// The `expect_error` kind of a ledger error. Collaborator errors are named
/// by their own variant.
#[must_use]
pub const fn error_kind(error: &LedgerError) -> &'static str {
    match error {
        LedgerError::NotAuthorized { .. } => "not_authorized",
        LedgerError::InsufficientBalance { .. } => "insufficient_balance",
        LedgerError::InsufficientAllowance { .. } => "insufficient_allowance",
        LedgerError::InsufficientProfitBalance { .. } => "insufficient_profit_balance",
        LedgerError::PrecisionError { .. } => "precision_error",
        LedgerError::ArithmeticError => "arithmetic_error",
        LedgerError::AlreadyRegistered { .. } => "already_registered",
        LedgerError::SourcesFinalized => "sources_finalized",
        LedgerError::WithdrawalNotAllowed { .. } => "withdrawal_not_allowed",
        LedgerError::UnknownSource(_) => "unknown_source",
        LedgerError::InvalidConfig(_) => "invalid_config",
        LedgerError::Policy(PolicyError::MintAllowanceExceeded { .. }) => "mint_allowance_exceeded",
        LedgerError::Policy(PolicyError::Locked { .. }) => "locked",
        LedgerError::Policy(PolicyError::Rejected(_)) => "policy_rejected",
        LedgerError::Token(TokenError::UnknownToken(_)) => "unknown_token",
        LedgerError::Token(TokenError::AlreadyDeployed(_)) => "already_deployed",
        LedgerError::Token(TokenError::InsufficientFunds { .. }) => "insufficient_funds",
        LedgerError::Token(TokenError::Overflow(_)) => "token_overflow",
        LedgerError::Token(TokenError::Rejected { .. }) => "token_rejected",
    }
}

/// A log emitted while replaying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedLog {
    /// 1-based step number; 0 for token deployments.
    pub step: usize,
    /// The log.
    pub record: LogRecord,
}

/// The outcome of a complete replay.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Steps executed.
    pub steps: usize,
    /// Every log, in emission order.
    pub logs: Vec<EmittedLog>,
    /// Every transfer into the ledger.
    pub deposits: Vec<DepositNotice>,
    /// The ledger's final state.
    pub state: LedgerState,
}

/// Drives one ledger through a scenario's steps.
pub struct Runner {
    directory: Directory,
    admin: Address,
    ledger: ProfitLedger<TokenBook>,
    encoder: LogEncoder,
    watcher: DepositWatcher,
    logs: Vec<EmittedLog>,
    deposits: Vec<DepositNotice>,
}

impl Runner {
    /// Validates `scenario`, deploys its tokens and creates the ledger.
    ///
    /// # Errors
    ///
    /// Any validation error, or a `Ledger` error if deployment fails.
    pub fn new(scenario: &Scenario) -> ScenarioResult<Self> {
        let directory = scenario.validate()?;
        let admin = directory.resolve(&scenario.admin)?;

        let mut book = TokenBook::new();
        for token in &scenario.tokens {
            let holder = directory.resolve(&token.holder)?;
            book.deploy(token.address, holder, token.supply.to_u256()?)
                .map_err(LedgerError::from)?;
        }

        let ledger = ProfitLedger::new(scenario.ledger_address, admin, book, &scenario.ledger)?;
        let mut runner = Self {
            directory,
            admin,
            encoder: LogEncoder::new(ledger.address()),
            watcher: DepositWatcher::for_ledger(&ledger),
            ledger,
            logs: Vec::new(),
            deposits: Vec::new(),
        };
        runner.collect_logs(0);
        Ok(runner)
    }

    /// Loads a scenario and replays all of its steps.
    ///
    /// # Errors
    ///
    /// The first setup problem or failed step.
    pub fn replay(scenario: &Scenario) -> ScenarioResult<RunReport> {
        let mut runner = Self::new(scenario)?;
        for (i, step) in scenario.steps.iter().enumerate() {
            runner.step(i + 1, step)?;
        }
        Ok(runner.finish(scenario.steps.len()))
    }

    /// The ledger under test.
    #[must_use]
    pub fn ledger(&self) -> &ProfitLedger<TokenBook> {
        &self.ledger
    }

    /// Name resolution for this scenario.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Executes step number `number`.
    ///
    /// # Errors
    ///
    /// `Step` if an action fails, `Expectation` or `WrongOutcome` if a check
    /// does not hold.
    pub fn step(&mut self, number: usize, step: &Step) -> ScenarioResult<()> {
        tracing::debug!("Step {}: {}", number, step.name());
        match step {
            Step::ExpectProfit {
                account,
                source,
                amount,
            } => {
                let actual = self
                    .ledger
                    .balance_of_profit(self.directory.resolve(account)?, *source)
                    .map_err(|e| ScenarioError::Step {
                        step: number,
                        op: step.name(),
                        source: e,
                    })?;
                Self::expect(number, format!("profit of {account} in source {source}"), amount, actual)?;
            }
            Step::ExpectBalance { account, amount } => {
                let actual = self.ledger.balance_of(self.directory.resolve(account)?);
                Self::expect(number, format!("shares of {account}"), amount, actual)?;
            }
            Step::ExpectTokenBalance {
                token,
                account,
                amount,
            } => {
                let actual = self
                    .ledger
                    .tokens()
                    .balance_of(self.directory.resolve(token)?, self.directory.resolve(account)?)
                    .map_err(|e| ScenarioError::Step {
                        step: number,
                        op: step.name(),
                        source: e.into(),
                    })?;
                Self::expect(number, format!("{token} balance of {account}"), amount, actual)?;
            }
            Step::ExpectError { error, step: inner } => match self.apply(inner)? {
                Ok(()) => {
                    return Err(ScenarioError::WrongOutcome {
                        step: number,
                        expected: error.clone(),
                        actual: format!("{} succeeded", inner.name()),
                    });
                }
                Err(e) if error_kind(&e) == error.as_str() => {
                    tracing::debug!("Step {}: {} failed as expected: {}", number, inner.name(), e);
                }
                Err(e) => {
                    return Err(ScenarioError::WrongOutcome {
                        step: number,
                        expected: error.clone(),
                        actual: format!("{} ({e})", error_kind(&e)),
                    });
                }
            },
            action => {
                self.apply(action)?.map_err(|source| ScenarioError::Step {
                    step: number,
                    op: action.name(),
                    source,
                })?;
            }
        }
        self.collect_logs(number);
        Ok(())
    }

    /// Ends the replay.
    #[must_use]
    pub fn finish(self, steps: usize) -> RunReport {
        RunReport {
            steps,
            logs: self.logs,
            deposits: self.deposits,
            state: self.ledger.state().clone(),
        }
    }

    fn expect(step: usize, what: String, expected: &Amount, actual: U256) -> ScenarioResult<()> {
        let expected = expected.to_u256()?;
        if expected != actual {
            return Err(ScenarioError::Expectation {
                step,
                what,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn caller(&self, caller: Option<&str>) -> ScenarioResult<Address> {
        caller.map_or(Ok(self.admin), |name| self.directory.resolve(name))
    }

    /// Runs an action. The outer result carries scenario problems, the inner
    /// one the ledger's verdict.
    fn apply(&mut self, step: &Step) -> ScenarioResult<LedgerResult<()>> {
        let resolve = |name: &str| self.directory.resolve(name);
        let outcome = match step {
            Step::Mint { caller, to, amount } => {
                let caller = self.caller(caller.as_deref())?;
                let (to, amount) = (resolve(to)?, amount.to_u256()?);
                self.ledger.mint(caller, to, amount)
            }
            Step::Transfer { from, to, amount } => {
                let (from, to, amount) = (resolve(from)?, resolve(to)?, amount.to_u256()?);
                self.ledger.transfer(from, to, amount)
            }
            Step::Approve {
                owner,
                spender,
                amount,
            } => {
                let (owner, spender, amount) = (resolve(owner)?, resolve(spender)?, amount.to_u256()?);
                self.ledger.approve(owner, spender, amount);
                Ok(())
            }
            Step::TransferFrom {
                spender,
                from,
                to,
                amount,
            } => {
                let (spender, from, to) = (resolve(spender)?, resolve(from)?, resolve(to)?);
                let amount = amount.to_u256()?;
                self.ledger.transfer_from(spender, from, to, amount)
            }
            Step::Deposit { token, from, amount } => {
                let (token, from, amount) = (resolve(token)?, resolve(from)?, amount.to_u256()?);
                let ledger = self.ledger.address();
                self.ledger
                    .tokens_mut()
                    .transfer(token, from, ledger, amount)
                    .map_err(LedgerError::from)
            }
            Step::Register { caller, token } => {
                let caller = self.caller(caller.as_deref())?;
                let token = resolve(token)?;
                self.ledger
                    .register_profit_source(caller, token)
                    .map(|index| self.watcher.track_source(index, token))
            }
            Step::Finalize { caller } => {
                let caller = self.caller(caller.as_deref())?;
                self.ledger.finalize_profit_sources(caller)
            }
            Step::Exclude { caller, account } => {
                let caller = self.caller(caller.as_deref())?;
                let account = resolve(account)?;
                self.ledger.exclude_from_profits(caller, account)
            }
            Step::Withdraw {
                account,
                source,
                amount,
            } => {
                let account = resolve(account)?;
                let amount = amount.as_ref().map(Amount::to_u256).transpose()?;
                self.withdraw(account, *source, amount)
            }
            Step::Recover {
                caller,
                token,
                amount,
            } => {
                let caller = self.caller(caller.as_deref())?;
                let (token, amount) = (resolve(token)?, amount.to_u256()?);
                self.ledger.recover_funds(caller, token, amount)
            }
            Step::TransferAdmin { caller, to } => {
                let caller = self.caller(caller.as_deref())?;
                let to = resolve(to)?;
                self.ledger.transfer_admin(caller, to)
            }
            Step::ExpectProfit { .. }
            | Step::ExpectBalance { .. }
            | Step::ExpectTokenBalance { .. }
            | Step::ExpectError { .. } => {
                return Err(ScenarioError::Invalid(format!(
                    "{} is not an action",
                    step.name()
                )));
            }
        };
        Ok(outcome)
    }

    fn withdraw(&mut self, account: Address, source: usize, amount: Option<U256>) -> LedgerResult<()> {
        let amount = match amount {
            Some(amount) => amount,
            None => self.ledger.balance_of_profit(account, source)?,
        };
        self.ledger.withdraw_profit(account, amount, source)
    }

    fn collect_logs(&mut self, step: usize) {
        for transfer in self.ledger.tokens_mut().drain_transfers() {
            let notice = self.watcher.observe(&Erc20Transfer {
                token: transfer.token,
                from: transfer.from,
                to: transfer.to,
                value: transfer.amount,
            });
            self.deposits.extend(notice);
            self.logs.push(EmittedLog {
                step,
                record: LogEncoder::token_transfer(&transfer),
            });
        }
        for event in self.ledger.drain_events() {
            self.logs.push(EmittedLog {
                step,
                record: self.encoder.encode(&event),
            });
        }
    }
}
