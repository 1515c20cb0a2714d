use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use rangegrid_algorithms::{
    synthetic::{drop_points, sweep},
    NullObserver, RobustFitOptions, SphericalProjection,
};
use rangegrid_core::containers::StructuredBuffer;

fn gen_sweep() -> StructuredBuffer {
    let truth = SphericalProjection::new(-3.1, 0.00613, -0.39, 0.0123, 64, 1024);
    let mut cloud = sweep(&truth, 20.0).unwrap();
    drop_points(&mut cloud, 0.3, &mut StdRng::seed_from_u64(0)).unwrap();
    cloud
}

fn fit_fast(cloud: &StructuredBuffer) {
    let mut model = SphericalProjection::default();
    model.fit_fast_observed(cloud, &NullObserver).unwrap();
    black_box(model);
}

fn fit_robust(cloud: &StructuredBuffer, rng: &mut StdRng) {
    let mut model = SphericalProjection::default();
    model
        .fit_robust_with(cloud, rng, &RobustFitOptions::default(), &NullObserver)
        .unwrap();
    black_box(model);
}

fn check(cloud: &StructuredBuffer, model: &SphericalProjection) {
    black_box(model.check_observed(cloud, &NullObserver).unwrap());
}

fn bench(c: &mut Criterion) {
    let cloud = gen_sweep();
    let mut rng = StdRng::seed_from_u64(1);
    let mut model = SphericalProjection::default();
    model.fit_fast_observed(&cloud, &NullObserver).unwrap();

    c.bench_function("fit_fast", |b| b.iter(|| fit_fast(&cloud)));
    c.bench_function("fit_robust", |b| b.iter(|| fit_robust(&cloud, &mut rng)));
    c.bench_function("check", |b| b.iter(|| check(&cloud, &model)));
}

criterion_group! {
    name = calibration;
    config = Criterion::default().sample_size(20);
    targets = bench
}
criterion_main!(calibration);
