//! Benchmark for ledger operations.
//!
//! TARGET: transfer cost independent of the number of holders
//!
//! Run with: cargo bench --package profitshare_ledger --bench ledger_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use profitshare_ledger::{Address, LedgerConfig, ProfitLedger, TokenBook, TokenLedger, U256};

const LEDGER: Address = Address::repeat_byte(0xEE);
const ADMIN: Address = Address::repeat_byte(0x01);
const SOURCES: [Address; 3] = [
    Address::repeat_byte(0xF0),
    Address::repeat_byte(0xF1),
    Address::repeat_byte(0xF2),
];

fn holder(i: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(i + 1).to_be_bytes());
    Address::from(bytes)
}

/// A ledger with `holders` accounts of 1000 shares each and three sources.
fn populated(holders: u64) -> ProfitLedger<TokenBook> {
    let mut book = TokenBook::new();
    for token in SOURCES {
        book.deploy(token, ADMIN, U256::from(u128::MAX)).unwrap();
    }
    let mut ledger = ProfitLedger::new(LEDGER, ADMIN, book, &LedgerConfig::default()).unwrap();
    for token in SOURCES {
        ledger.register_profit_source(ADMIN, token).unwrap();
    }
    for i in 0..holders {
        ledger.mint(ADMIN, holder(i), U256::from(1000)).unwrap();
    }
    ledger
}

fn benchmark_transfer(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_with_deposits");
    group.throughput(Throughput::Elements(1));

    for holders in [100u64, 1_000, 10_000] {
        let mut ledger = populated(holders);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        group.bench_with_input(BenchmarkId::from_parameter(holders), &holders, |b, &n| {
            b.iter(|| {
                let from = holder(rng.gen_range(0..n));
                let to = holder(rng.gen_range(0..n));
                let token = SOURCES[rng.gen_range(0..SOURCES.len())];
                ledger
                    .tokens_mut()
                    .transfer(token, ADMIN, LEDGER, U256::from(rng.gen_range(1..1_000u64)))
                    .unwrap();
                let _ = black_box(ledger.transfer(from, to, black_box(U256::from(1))));
            });
        });
    }

    group.finish();
}

fn benchmark_profit_query(c: &mut Criterion) {
    let mut ledger = populated(1_000);
    ledger
        .tokens_mut()
        .transfer(SOURCES[0], ADMIN, LEDGER, U256::from(1_000_000u64))
        .unwrap();

    c.bench_function("balance_of_profit", |b| {
        b.iter(|| black_box(ledger.balance_of_profit(black_box(holder(7)), 0)));
    });
}

fn benchmark_withdraw(c: &mut Criterion) {
    let mut ledger = populated(1_000);

    c.bench_function("deposit_then_withdraw", |b| {
        b.iter(|| {
            ledger
                .tokens_mut()
                .transfer(SOURCES[1], ADMIN, LEDGER, U256::from(1_000_000u64))
                .unwrap();
            let owed = ledger.balance_of_profit(holder(3), 1).unwrap();
            black_box(ledger.withdraw_profit(holder(3), owed, 1)).unwrap();
        });
    });
}

criterion_group!(benches, benchmark_transfer, benchmark_profit_query, benchmark_withdraw);
criterion_main!(benches);
