use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use keyforge_crypto::{
    derive_key, derive_master_seed_with_iterations, domains, primitives, MasterSeed,
};
use std::hint::black_box;
use std::time::Duration;

fn bench_master_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("master_derivation");
    group.measurement_time(Duration::from_secs(20)); // PBKDF2 is slow by design

    // Full-cost derivation is benchmarked once; parameter scaling uses
    // reduced iteration counts.
    for iterations in [1_000u32, 50_000, 500_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |b, &iters| {
                b.iter(|| {
                    black_box(derive_master_seed_with_iterations(
                        "correct horse battery staple",
                        "alice",
                        1,
                        iters,
                    ))
                });
            },
        );
    }

    group.finish();
}

fn bench_domain_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain_expansion");
    group.measurement_time(Duration::from_secs(10));

    let seed = MasterSeed::from_bytes([0u8; 64]);

    for len in [32usize, 64, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| black_box(derive_key(&seed, domains::SSH, 0, len).unwrap()));
        });
    }

    group.finish();
}

fn bench_aead(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault_aead");
    group.measurement_time(Duration::from_secs(10));

    let key = [7u8; 32];
    let nonce = [1u8; 12];

    for size in [256usize, 8192, 65536] {
        let plaintext = vec![0u8; size];
        group.bench_with_input(
            BenchmarkId::new("seal", size),
            &plaintext,
            |b, plaintext| {
                b.iter(|| {
                    black_box(
                        primitives::chacha20poly1305_seal(&key, &nonce, plaintext).unwrap(),
                    )
                });
            },
        );

        let (ct, tag) = primitives::chacha20poly1305_seal(&key, &nonce, &plaintext).unwrap();
        group.bench_with_input(BenchmarkId::new("open", size), &(ct, tag), |b, (ct, tag)| {
            b.iter(|| black_box(primitives::chacha20poly1305_open(&key, &nonce, ct, tag).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_master_derivation,
    bench_domain_expansion,
    bench_aead
);
criterion_main!(benches);
