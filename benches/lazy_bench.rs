#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use ndarray::{ArrayD, IxDyn};
use nestcode::{File, Mode, Nestcode, Value};
use std::hint::black_box;

fn bench_lazy(c: &mut Criterion) {
    let rows = 2_000;
    let cols = 500;
    let array = ArrayD::from_shape_vec(
        IxDyn(&[rows, cols]),
        (0..rows * cols).map(|v| v as f64).collect(),
    )
    .expect("shape matches element count");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let plain = dir.path().join("plain.nst");
    let packed = dir.path().join("packed.nst");

    let mut file = File::open(&plain, Mode::Truncate).expect("Failed to create file");
    file.set("data", array.clone()).expect("Failed to write array");
    file.close().expect("Failed to close file");

    let mut file = Nestcode::builder()
        .compression(true)
        .open(&packed, Mode::Truncate)
        .expect("Failed to create file");
    file.set("data", array).expect("Failed to write array");
    file.close().expect("Failed to close file");

    let mut group = c.benchmark_group("Lazy Access");

    // Case A: full materialization
    group.bench_function("full_load", |b| {
        b.iter(|| {
            let value = Nestcode::load(&plain, "data").expect("Failed to load");
            black_box(value);
        });
    });

    // Case B: one row through a lazy reference
    group.bench_function("lazy_single_row", |b| {
        b.iter(|| {
            let file = File::open(&plain, Mode::Read).expect("Failed to open");
            let value = file.get("data").expect("Failed to read");
            let lazy = value.as_lazy().expect("arrays read lazily");
            black_box(lazy.get(rows / 2).expect("Failed to read row"));
        });
    });

    // Case C: one row of a compressed payload
    group.bench_function("lazy_single_row_lz4", |b| {
        b.iter(|| {
            let file = File::open(&packed, Mode::Read).expect("Failed to open");
            let value = file.get("data").expect("Failed to read");
            let lazy = value.as_lazy().expect("arrays read lazily");
            black_box(lazy.get(rows / 2).expect("Failed to read row"));
        });
    });

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let nested = Value::list((0..200).map(|i| {
        Value::tuple([
            Value::Int(i),
            Value::Str(format!("item-{i}")),
            Value::from(ArrayD::<f32>::zeros(IxDyn(&[64]))),
        ])
    }));

    c.bench_function("encode_nested_in_memory", |b| {
        b.iter(|| {
            let mut file = File::in_memory();
            file.write("n", black_box(&nested), false)
                .expect("Failed to write");
            black_box(file.to_bytes().expect("Failed to serialize"));
        });
    });
}

criterion_group!(benches, bench_lazy, bench_write);
criterion_main!(benches);
