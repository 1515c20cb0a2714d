use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{prelude::SliceRandom, thread_rng, Rng};
use rangegrid_core::containers::StructuredBuffer;

fn gen_random_sweep(height: u32, width: u32) -> StructuredBuffer {
    let mut buffer = StructuredBuffer::new();
    buffer.append_position_fields().unwrap();
    buffer.append_normal_fields().unwrap();
    buffer.append_traversability_fields().unwrap();
    buffer.resize(height, width).unwrap();

    let mut rng = thread_rng();
    let values = (0..buffer.num_points())
        .map(|_| rng.gen::<f32>())
        .collect::<Vec<_>>();
    for name in &["x", "y", "z"] {
        buffer.write_field(name, &values).unwrap();
    }
    buffer
}

fn select_half(buffer: &StructuredBuffer, indices: &[usize]) {
    let mut selected = StructuredBuffer::new();
    buffer.select(indices, &mut selected).unwrap();
    black_box(selected);
}

fn sum_field(buffer: &StructuredBuffer) {
    let sum: f32 = buffer.read_field::<f32>("z").unwrap().sum();
    black_box(sum);
}

fn bench(c: &mut Criterion) {
    let buffer = gen_random_sweep(64, 1024);
    let mut indices = (0..buffer.num_points()).collect::<Vec<_>>();
    indices.shuffle(&mut thread_rng());
    indices.truncate(buffer.num_points() / 2);

    c.bench_function("select_half_shuffled", |b| {
        b.iter(|| select_half(&buffer, &indices));
    });
    c.bench_function("read_field_sum", |b| {
        b.iter(|| sum_field(&buffer));
    });
}

criterion_group! {
    name = select;
    config = Criterion::default().sample_size(40);
    targets = bench
}
criterion_main!(select);
