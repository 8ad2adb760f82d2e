//! Benchmarks for sparseblk store operations

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use sparseblk::{Config, GrowthPolicy, Store, BLOCK_SIZE};

fn store_with(policy: GrowthPolicy) -> Store {
    let config = Config::builder()
        .initial_capacity(1)
        .growth_policy(policy)
        .build();
    Store::new(&config).unwrap()
}

fn store_benchmarks(c: &mut Criterion) {
    let block = vec![0x5Au8; BLOCK_SIZE];

    // Sequential whole-block writes into a fresh store, per growth policy
    for (name, policy) in [
        ("sequential_write_doubling", GrowthPolicy::Doubling),
        ("sequential_write_exact_fit", GrowthPolicy::ExactFit),
    ] {
        c.bench_function(name, |b| {
            b.iter_batched(
                || store_with(policy),
                |store| {
                    for i in 0..256u64 {
                        store.write(i * BLOCK_SIZE as u64, &block, BLOCK_SIZE).unwrap();
                    }
                    store
                },
                BatchSize::SmallInput,
            )
        });
    }

    // Small reads from already materialized blocks
    let store = store_with(GrowthPolicy::Doubling);
    for i in 0..64u64 {
        store.write(i * BLOCK_SIZE as u64, &block, BLOCK_SIZE).unwrap();
    }
    c.bench_function("read_512_hot", |b| {
        let mut buf = [0u8; 512];
        let mut i = 0u64;
        b.iter(|| {
            let offset = (i % 64) * BLOCK_SIZE as u64 + 256;
            i = i.wrapping_add(7);
            black_box(store.read(offset, &mut buf, 512).unwrap())
        })
    });

    // First-touch reads: growth + zero-fill on every iteration
    c.bench_function("sparse_first_touch", |b| {
        b.iter_batched(
            || store_with(GrowthPolicy::Doubling),
            |store| {
                let mut buf = [0u8; 1];
                for i in 0..64u64 {
                    store.read(i * 97 * BLOCK_SIZE as u64, &mut buf, 1).unwrap();
                }
                store
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
