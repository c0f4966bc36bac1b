use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deep_dream as dd;
use dd::GradientProvider;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::time::{Duration, Instant};

fn noise(dim: usize, seed: usize) -> dd::Image {
    dd::Image::from_shape_fn((dim, dim, 3), |(y, x, c)| {
        ((y * 31 + x * 17 + c * 7 + seed * 13) % 251) as f32
    })
}

fn dream_pair(c: &mut Criterion) {
    static DIM: usize = 32;

    let mut group = c.benchmark_group("dream_pair");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        // Generate the inputs once to reduce variation between runs,
        // though we still do a copy each run
        let right = noise(*dim, 0);
        let left = noise(*dim, 1);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, _| {
            b.iter_custom(|iters| {
                let mut total_elapsed = Duration::new(0, 0);
                for _i in 0..iters {
                    let sess = dd::Session::builder(dd::FilterBank::default())
                        .iterations(3)
                        .levels(2)
                        .layers(dd::LayerSelection::Fixed(vec![4]))
                        .build()
                        .unwrap();

                    let start = Instant::now();
                    black_box(
                        sess.dream(&right, &left, &mut Pcg32::seed_from_u64(120), |_| {})
                            .unwrap(),
                    );
                    total_elapsed += start.elapsed();
                }

                total_elapsed
            });
        });
    }
    group.finish();
}

fn tiled_gradient(c: &mut Criterion) {
    static DIM: usize = 64;

    let bank = dd::FilterBank::default();
    let tiled = dd::TiledGradient::new(&bank, 64);

    let mut group = c.benchmark_group("tiled_gradient");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM].iter() {
        let img = noise(*dim, 2);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, _| {
            let mut rng = Pcg32::seed_from_u64(211);
            b.iter(|| black_box(tiled.evaluate(&bank.layers()[8], &img, &mut rng).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, dream_pair, tiled_gradient);
criterion_main!(benches);
