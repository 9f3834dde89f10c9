use criterion::{criterion_group, criterion_main, Criterion};
use subchannel_math::banded::BandedLu;
use subchannel_math::gmres::{gmres_solve, GmresConfig};
use subchannel_math::sparse::{CsrMatrix, TripletBuilder};
use std::hint::black_box;

/// Level-interleaved system shaped like a 42-channel, 20-level block.
fn bundle_like(levels: usize, per_level: usize) -> CsrMatrix {
    let n = levels * per_level;
    let mut t = TripletBuilder::new(n, n);
    for k in 0..levels {
        for e in 0..per_level {
            let row = k * per_level + e;
            t.add(row, row, 6.0);
            t.add(row, k * per_level + (e + 1) % per_level, -1.0);
            t.add(row, k * per_level + (e + per_level - 1) % per_level, -1.0);
            if k > 0 {
                t.add(row, (k - 1) * per_level + e, -2.5);
            }
        }
    }
    t.build().unwrap()
}

fn bench_gmres_bundle(c: &mut Criterion) {
    let a = bundle_like(20, 126);
    let b = vec![1.0; a.n_rows()];
    let config = GmresConfig::default();

    c.bench_function("gmres_bundle_20x126", |bench| {
        bench.iter(|| {
            let mut op = a.clone();
            let mut x = vec![0.0; b.len()];
            let res = gmres_solve(&mut op, &b, &mut x, &config).unwrap();
            black_box(res.iterations);
        })
    });
}

fn bench_gmres_vs_banded(c: &mut Criterion) {
    let a = bundle_like(20, 126);
    let b = vec![1.0; a.n_rows()];

    let mut group = c.benchmark_group("gmres_vs_banded_20x126");
    group.sample_size(10);

    group.bench_function("banded_lu", |bench| {
        bench.iter(|| {
            let x = BandedLu::factor(&a).unwrap().solve(&b).unwrap();
            black_box(x[0]);
        })
    });

    group.bench_function("gmres_30_jacobi", |bench| {
        bench.iter(|| {
            let mut op = a.clone();
            let mut x = vec![0.0; b.len()];
            let res = gmres_solve(&mut op, &b, &mut x, &GmresConfig::default()).unwrap();
            black_box(res.iterations);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_gmres_bundle, bench_gmres_vs_banded);
criterion_main!(benches);
