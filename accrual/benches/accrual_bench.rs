use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use revshare_accrual::{AccrualEngine, AccrualFormula};
use revshare_store::{BalanceStore, MemoryBalanceStore};
use revshare_types::{Address, Timestamp};

fn holder(i: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&(i + 1).to_be_bytes());
    Address::new(bytes)
}

fn populated(holders: u32) -> (MemoryBalanceStore, AccrualEngine) {
    let mut store = MemoryBalanceStore::new();
    for i in 0..holders {
        store.mint(&holder(i), 1_000 + i as u128).unwrap();
    }
    let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, Timestamp::new(0));
    engine.record_deposit(1_000_000, &store, Timestamp::new(1)).unwrap();
    (store, engine)
}

fn bench_settle(c: &mut Criterion) {
    let mut group = c.benchmark_group("accrual_settle");
    for holders in [10u32, 1_000, 100_000] {
        let (store, mut engine) = populated(holders);
        group.bench_with_input(BenchmarkId::new("settle", holders), &holders, |b, _| {
            b.iter(|| engine.settle(black_box(&holder(0)), &store, Timestamp::new(2)).unwrap());
        });
    }
    group.finish();
}

fn bench_earned(c: &mut Criterion) {
    let (store, engine) = populated(1_000);
    c.bench_function("accrual_earned", |b| {
        b.iter(|| black_box(engine.earned(black_box(&holder(7)), &store).unwrap()));
    });
}

fn bench_deposit(c: &mut Criterion) {
    let (store, mut engine) = populated(1_000);
    c.bench_function("accrual_record_deposit", |b| {
        b.iter(|| engine.record_deposit(black_box(10), &store, Timestamp::new(3)).unwrap());
    });
}

criterion_group!(benches, bench_settle, bench_earned, bench_deposit);
criterion_main!(benches);
