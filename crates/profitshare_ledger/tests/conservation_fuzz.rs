//! Property tests for the ledger's accounting invariants.
//!
//! Random sequences of mints, transfers, deposits, withdrawals and
//! exclusions are applied; after every step the supply counters must match
//! the accounts, failed operations must leave the state untouched, and no
//! source may owe more than it has received.

use proptest::prelude::*;

use profitshare_ledger::{Address, LedgerConfig, ProfitLedger, TokenBook, TokenLedger, U256};

const HOLDERS: usize = 5;
const LEDGER: Address = Address::repeat_byte(0xEE);
const ADMIN: Address = Address::repeat_byte(0x01);
const PAYER: Address = Address::repeat_byte(0x0F);
const SOURCES: [Address; 2] = [Address::repeat_byte(0xF0), Address::repeat_byte(0xF1)];

#[derive(Clone, Debug)]
enum Op {
    Mint(usize, u64),
    Transfer(usize, usize, u64),
    Deposit(usize, u64),
    Withdraw(usize, usize, u64),
    Exclude(usize),
}

fn holder(i: usize) -> Address {
    // holder 0 is the admin
    if i == 0 {
        ADMIN
    } else {
        Address::repeat_byte(0x20 + i as u8)
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..HOLDERS, 1u64..50_000).prop_map(|(to, amount)| Op::Mint(to, amount)),
        5 => (0..HOLDERS, 0..HOLDERS, 0u64..20_000).prop_map(|(from, to, amount)| Op::Transfer(from, to, amount)),
        3 => (0..SOURCES.len(), 1u64..10_000_000).prop_map(|(source, amount)| Op::Deposit(source, amount)),
        3 => (0..HOLDERS, 0..SOURCES.len(), 0u64..5_000_000).prop_map(|(who, source, amount)| Op::Withdraw(who, source, amount)),
        1 => (0..HOLDERS).prop_map(Op::Exclude),
    ]
}

fn setup() -> ProfitLedger<TokenBook> {
    let mut book = TokenBook::new();
    for token in SOURCES {
        book.deploy(token, PAYER, U256::from(u64::MAX)).unwrap();
    }
    let mut ledger = ProfitLedger::new(LEDGER, ADMIN, book, &LedgerConfig::default()).unwrap();
    for token in SOURCES {
        ledger.register_profit_source(ADMIN, token).unwrap();
    }
    ledger
}

fn apply(ledger: &mut ProfitLedger<TokenBook>, op: &Op, deposited: &mut [U256]) {
    let before = ledger.state().clone();
    let result = match *op {
        Op::Mint(to, amount) => ledger.mint(ADMIN, holder(to), U256::from(amount)),
        Op::Transfer(from, to, amount) => ledger.transfer(holder(from), holder(to), U256::from(amount)),
        Op::Deposit(source, amount) => {
            ledger
                .tokens_mut()
                .transfer(SOURCES[source], PAYER, LEDGER, U256::from(amount))
                .unwrap();
            deposited[source] += U256::from(amount);
            Ok(())
        }
        Op::Withdraw(who, source, amount) => {
            ledger.withdraw_profit(holder(who), U256::from(amount), source)
        }
        Op::Exclude(who) => ledger.exclude_from_profits(ADMIN, holder(who)),
    };
    if result.is_err() {
        assert_eq!(ledger.state(), &before, "failed {op:?} changed the state");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn fuzz_supply_matches_accounts(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = setup();
        let mut deposited = [U256::ZERO; SOURCES.len()];

        for op in &ops {
            apply(&mut ledger, op, &mut deposited);

            let mut total = U256::ZERO;
            let mut excluded = U256::ZERO;
            for i in 0..HOLDERS {
                total += ledger.balance_of(holder(i));
                if ledger.is_excluded(holder(i)) {
                    excluded += ledger.balance_of(holder(i));
                }
            }
            prop_assert_eq!(ledger.total_supply(), total);
            prop_assert_eq!(ledger.excluded_supply(), excluded);
            prop_assert_eq!(ledger.effective_supply(), total - excluded);
        }
    }

    #[test]
    fn fuzz_profit_never_exceeds_deposits(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = setup();
        let mut deposited = [U256::ZERO; SOURCES.len()];

        for op in &ops {
            apply(&mut ledger, op, &mut deposited);

            for (index, received) in deposited.iter().enumerate() {
                let mut owed = ledger.profit_source(index).unwrap().paid_out;
                for i in 0..HOLDERS {
                    owed += ledger.balance_of_profit(holder(i), index).unwrap();
                }
                prop_assert!(owed <= *received, "source {} owes {} of {}", index, owed, received);
            }
        }
    }

    #[test]
    fn fuzz_accumulators_monotonic(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = setup();
        let mut deposited = [U256::ZERO; SOURCES.len()];
        let mut last = [(U256::ZERO, U256::ZERO); SOURCES.len()];

        for op in &ops {
            apply(&mut ledger, op, &mut deposited);

            for (index, previous) in last.iter_mut().enumerate() {
                let source = ledger.profit_source(index).unwrap();
                prop_assert!(source.accumulator >= previous.0);
                prop_assert!(source.last_observed >= previous.1);
                *previous = (source.accumulator, source.last_observed);
            }
        }
    }

    #[test]
    fn fuzz_profit_query_idempotent(ops in prop::collection::vec(op_strategy(), 1..30), who in 0..HOLDERS) {
        let mut ledger = setup();
        let mut deposited = [U256::ZERO; SOURCES.len()];
        for op in &ops {
            apply(&mut ledger, op, &mut deposited);
        }

        let before = ledger.state().clone();
        let first = ledger.balance_of_profit(holder(who), 0).unwrap();
        let second = ledger.balance_of_profit(holder(who), 0).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(ledger.state(), &before);
    }
}
