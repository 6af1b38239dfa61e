use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glyphfield_core::{DistanceField, FieldBackend, RasterBitmap};
use glyphfield_sdf::{transform, CpuBackend};

/// Grid of filled squares, roughly like a packed atlas.
fn checker(size: u32) -> RasterBitmap {
    let mut bitmap = RasterBitmap::new(size, size);
    for y in 0..size {
        for x in 0..size {
            if (x / 16 + y / 16) % 2 == 0 && x % 16 > 3 && y % 16 > 3 {
                bitmap.set(x, y, 255);
            }
        }
    }
    bitmap
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("dead_reckoning");

    for size in [256, 1024] {
        let bitmap = checker(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &bitmap, |b, bitmap| {
            b.iter(|| transform(black_box(bitmap)));
        });
    }

    group.finish();
}

fn bench_cpu_process(c: &mut Criterion) {
    let field = transform(&checker(1024));

    c.bench_function("cpu_process_1024_to_256", |b| {
        b.iter(|| {
            CpuBackend
                .process(black_box(field.clone()), 6.0, 256, 256)
                .unwrap()
        });
    });
}

fn bench_cpu_resample_fractional(c: &mut Criterion) {
    let field = DistanceField::filled(1000, 1000, 0.5);

    c.bench_function("cpu_resample_1000_to_300", |b| {
        b.iter(|| CpuBackend.resample(black_box(&field), 300, 300).unwrap());
    });
}

criterion_group!(
    benches,
    bench_transform,
    bench_cpu_process,
    bench_cpu_resample_fractional,
);
criterion_main!(benches);
