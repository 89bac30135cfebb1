use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use maxmem::estimator::{Estimator, LruClock, ManualTimeSource};
use maxmem::{DbId, EvictionConfig, EvictionPolicy, EvictionPool, Evictor, MemoryStore, MemoryTracker};

fn bench_pool_insert(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let scores: Vec<u64> = (0..4096).map(|_| rng.gen()).collect();
    let keys: Vec<String> = (0..4096).map(|i| format!("key:{}", i)).collect();

    c.bench_function("pool_insert_4096", |b| {
        b.iter(|| {
            let mut pool = EvictionPool::new();
            for (score, key) in scores.iter().zip(&keys) {
                pool.insert(*score, DbId::new(0), key);
            }
            pool
        })
    });
}

fn create_full_store(policy: EvictionPolicy, keys: usize) -> (Evictor, MemoryStore) {
    let config = EvictionConfig {
        policy,
        rng_seed: Some(3),
        ..EvictionConfig::default()
    };
    let time = Arc::new(ManualTimeSource::new(1_000_000));
    let clock = Arc::new(LruClock::from_config(&config, time));
    let memory = Arc::new(MemoryTracker::new());
    let mut store = MemoryStore::new(
        16,
        Arc::clone(&memory),
        Estimator::from_config(&config, Arc::clone(&clock)),
    )
    .with_rng_seed(3);
    for i in 0..keys {
        store.set(DbId::new(i % 16), &format!("key:{}", i), vec![0u8; 32]);
    }

    let mut evictor = Evictor::new(config, clock, memory).unwrap();
    evictor.set_maxmemory(store.memory().used() / 2);
    (evictor, store)
}

fn bench_evict_half(c: &mut Criterion) {
    for policy in [
        EvictionPolicy::AllKeysLru,
        EvictionPolicy::AllKeysLfu,
        EvictionPolicy::AllKeysRandom,
    ] {
        c.bench_function(&format!("evict_half_10k_{}", policy), |b| {
            b.iter_batched(
                || create_full_store(policy, 10_000),
                |(mut evictor, mut store)| evictor.free_memory_if_needed(&mut store).unwrap(),
                BatchSize::LargeInput,
            )
        });
    }
}

criterion_group!(benches, bench_pool_insert, bench_evict_half);
criterion_main!(benches);
