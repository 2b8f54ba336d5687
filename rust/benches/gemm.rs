use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use numblas::{DispatchConfig, Dispatcher, SliceRange, Tensor};


const SIDES: [usize; 3] = [16, 64, 128];

pub fn gemm_benchmark(c: &mut Criterion) {
    let accelerated = Dispatcher::default();
    let generic = Dispatcher::new(DispatchConfig::default().accelerate(false));

    let mut group = c.benchmark_group("Square GEMM");

    for side in SIDES {
        let a = native::generate_random_tensor(&[side, side]);
        let b = native::generate_random_tensor(&[side, side]);
        let mut out = Tensor::new(&[side, side], 0.0);

        group.bench_with_input(BenchmarkId::new("Accelerated", side), &side, |bench, _| {
            bench.iter(|| accelerated.gemm(&a, &b, &mut out, false, false, 1.0, 0.0))
        });
        group.bench_with_input(BenchmarkId::new("Accelerated Transposed", side), &side, |bench, _| {
            bench.iter(|| accelerated.gemm(&a, &b, &mut out, true, true, 1.0, 0.0))
        });
        group.bench_with_input(BenchmarkId::new("Generic", side), &side, |bench, _| {
            bench.iter(|| generic.gemm(&a, &b, &mut out, false, false, 1.0, 0.0))
        });
        group.bench_with_input(BenchmarkId::new("Rust Native", side), &side, |bench, &side| {
            bench.iter(|| native::matmul_cpu(a.as_slice(), b.as_slice(), side, side, side))
        });
    }
    group.finish();

    // Every other column of a wider matrix forces a contiguous copy
    let mut group = c.benchmark_group("Strided GEMM");
    for side in SIDES {
        let wide = native::generate_random_tensor(&[side, 2 * side]);
        let b = native::generate_random_tensor(&[side, side]);
        let mut out = Tensor::new(&[side, side], 0.0);
        let Ok(gapped) = wide.slice(&[SliceRange::full(), SliceRange::range_step(0, 2 * side, 2)])
        else {
            continue;
        };

        group.bench_with_input(BenchmarkId::new("Accelerated Copy", side), &side, |bench, _| {
            bench.iter(|| accelerated.gemm(gapped, &b, &mut out, false, false, 1.0, 0.0))
        });
        group.bench_with_input(BenchmarkId::new("Generic In Place", side), &side, |bench, _| {
            bench.iter(|| generic.gemm(gapped, &b, &mut out, false, false, 1.0, 0.0))
        });
    }
    group.finish();
}

criterion_group!(benches, gemm_benchmark);
criterion_main!(benches);
