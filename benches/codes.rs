//! Integer code benchmarks.
//!
//! Random-access `get` and encode throughput for the three codes, with
//! both select backings for gamma. The value stream is mostly small and
//! slowly growing with occasional large spikes, the shape rule streams
//! take in practice.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slp_access::{FixedCode, GammaCode, IncCode, IntCode, SampledSelect, SparseSelect};

fn skewed_values(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            if rng.gen_ratio(1, 50) {
                rng.gen_range(0..1u64 << 40)
            } else {
                (i as u64).saturating_sub(rng.gen_range(0..32))
            }
        })
        .collect()
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("code_get");
    let n = 100_000usize;
    let values = skewed_values(n, 7);
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let queries: Vec<usize> = (0..10_000).map(|_| rng.gen_range(0..n)).collect();

    macro_rules! code {
        ($name:expr, $ty:ty) => {{
            let code = <$ty>::encode(&values).unwrap();
            group.bench_with_input(
                BenchmarkId::new($name, n),
                &(&code, &queries),
                |b, (code, queries)| {
                    b.iter(|| {
                        let mut sum = 0u64;
                        for &q in queries.iter() {
                            sum = sum.wrapping_add(code.get(black_box(q)));
                        }
                        sum
                    })
                },
            );
        }};
    }

    code!("fixed", FixedCode);
    code!("inc", IncCode);
    code!("gamma_mcl", GammaCode<SampledSelect>);
    code!("gamma_sd", GammaCode<SparseSelect>);

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("code_encode");
    let n = 100_000usize;
    let values = skewed_values(n, 7);

    macro_rules! code {
        ($name:expr, $ty:ty) => {{
            group.bench_with_input(
                BenchmarkId::new($name, n),
                &values,
                |b, values| {
                    b.iter(|| <$ty>::encode(black_box(values)).unwrap().len())
                },
            );
        }};
    }

    code!("fixed", FixedCode);
    code!("inc", IncCode);
    code!("gamma_mcl", GammaCode<SampledSelect>);
    code!("gamma_sd", GammaCode<SparseSelect>);

    group.finish();
}

criterion_group!(benches, bench_get, bench_encode);
criterion_main!(benches);
