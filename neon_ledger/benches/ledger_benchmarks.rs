use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use neon_ledger::game::{GameOutcome, validate_outcome};
use neon_ledger::wallet::EntryCategory;
use neon_ledger::{Ledger, LedgerConfig, MemoryStore};
use rust_decimal::Decimal;
use std::hint::black_box;
use tokio::runtime::Runtime;

fn dice_outcome() -> GameOutcome {
    GameOutcome {
        game_type: "dice".to_string(),
        bet_amount: Decimal::new(1000, 2),
        win_amount: Decimal::new(1980, 2),
        multiplier: Some(Decimal::new(198, 2)),
        result_data: None,
    }
}

/// Helper to create a ledger with one richly funded player
fn funded_ledger(rt: &Runtime) -> Ledger<MemoryStore> {
    let ledger = Ledger::new(MemoryStore::new(), LedgerConfig::default());
    rt.block_on(async {
        ledger
            .wallets
            .credit(
                "bench",
                Decimal::from(1_000_000_000),
                "Bench float",
                EntryCategory::AdminAdjustment,
            )
            .await
            .unwrap();
    });
    ledger
}

/// Benchmark outcome validation alone
fn bench_validate_outcome(c: &mut Criterion) {
    c.bench_function("validate_dice_outcome", |b| {
        b.iter(|| validate_outcome(black_box(dice_outcome())).unwrap());
    });
}

/// Benchmark a full settlement unit on the memory store
fn bench_settle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let ledger = funded_ledger(&rt);

    c.bench_function("settle_dice_win", |b| {
        b.iter(|| {
            rt.block_on(ledger.games.settle("bench", dice_outcome()))
                .unwrap()
        });
    });
}

/// Benchmark log replay for growing histories
fn bench_reconcile(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("reconcile");

    for entries in [10usize, 100, 1000] {
        let ledger = funded_ledger(&rt);
        rt.block_on(async {
            for _ in 0..entries {
                ledger
                    .wallets
                    .debit("bench", Decimal::ONE, "Withdrawal", EntryCategory::Withdrawal)
                    .await
                    .unwrap();
            }
        });

        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, _| {
            b.iter(|| rt.block_on(ledger.wallets.reconcile("bench")).unwrap());
        });
    }

    group.finish();
}

criterion_group!(settlement, bench_validate_outcome, bench_settle);
criterion_group!(queries, bench_reconcile);
criterion_main!(settlement, queries);
