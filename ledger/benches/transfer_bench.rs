// Transfer engine benchmarks.
//
// Covers distribution out of an exempt account, fractional transfers between
// holders, direct token transfers, and the audit as holder count grows.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ngu_ledger::{audit, Address, LedgerConfig, TransferEngine};

fn deployed() -> (TransferEngine, Address, u128) {
    let deployer = Address::derive("bench-deployer");
    let mut config = LedgerConfig::default();
    config.max_total_supply = ngu_ledger::MaxSupply::WholeUnits(1_000_000);
    let engine = TransferEngine::with_initial_mint(config, deployer).expect("deploy");
    let units = engine.units();
    (engine, deployer, units)
}

fn bench_exempt_to_holder(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer/exempt_to_holder");
    for whole_units in [1u128, 10, 100] {
        group.throughput(Throughput::Elements(whole_units as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(whole_units),
            &whole_units,
            |b, &n| {
                let (engine, deployer, units) = deployed();
                let holder = Address::derive("holder");
                b.iter_batched(
                    || engine.clone(),
                    |mut e| e.transfer(deployer, holder, n * units).expect("transfer"),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_holder_to_holder(c: &mut Criterion) {
    let (mut engine, deployer, units) = deployed();
    let alice = Address::derive("alice");
    let bob = Address::derive("bob");
    engine.transfer(deployer, alice, 1_000 * units).expect("fund");
    engine.transfer(deployer, bob, 1_000 * units).expect("fund");

    c.bench_function("transfer/holder_to_holder_fractional", |b| {
        b.iter(|| {
            engine.transfer(alice, bob, units / 2 + 1).expect("a->b");
            engine.transfer(bob, alice, units / 2 + 1).expect("b->a");
            engine.take_events();
        });
    });
}

fn bench_erc721_transfer(c: &mut Criterion) {
    let (mut engine, deployer, units) = deployed();
    let alice = Address::derive("alice");
    let bob = Address::derive("bob");
    engine.transfer(deployer, alice, units).expect("fund");

    c.bench_function("transfer/erc721_ping_pong", |b| {
        b.iter(|| {
            let id = engine.owned(&alice)[0];
            engine.erc721_transfer_from(alice, alice, bob, id).expect("a->b");
            engine.erc721_transfer_from(bob, bob, alice, id).expect("b->a");
            engine.take_events();
        });
    });
}

fn bench_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("audit/holders");
    for n in [10usize, 100, 1_000] {
        let (mut engine, deployer, units) = deployed();
        for i in 0..n {
            let holder = Address::derive(&format!("holder-{i}"));
            engine.transfer(deployer, holder, 3 * units).expect("fund");
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &engine, |b, e| {
            b.iter(|| audit(e).expect("audit"));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_exempt_to_holder,
    bench_holder_to_holder,
    bench_erc721_transfer,
    bench_audit,
);
criterion_main!(benches);
