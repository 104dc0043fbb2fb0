use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rstream::{ExecutionConfig, ExecutionContext, RStream, Splitor};
use std::time::Duration;

// Light per-element work: arithmetic only
fn light_task(x: u64) -> u64 {
    let mut result = x;
    for _ in 0..5 {
        result = result.wrapping_mul(17).wrapping_add(1);
    }
    result
}

// Heavier per-element work where parallelism should pay off
fn heavy_task(x: u64) -> f64 {
    let mut result = 0.0f64;
    for i in 0..200 {
        result += ((x * i) as f64).sin().cos().abs();
    }
    result
}

fn bench_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(30);

    for size in [10_000u64, 1_000_000].iter() {
        let data: Vec<u64> = (0..*size).collect();

        group.bench_with_input(BenchmarkId::new("sequential", size), &data, |b, data| {
            b.iter(|| black_box(RStream::from_vec(data.clone()).sum().unwrap()))
        });

        let context = ExecutionContext::with_config(ExecutionConfig::new());
        group.bench_with_input(BenchmarkId::new("parallel", size), &data, |b, data| {
            b.iter(|| {
                let stream = RStream::from_vec(data.clone()).parallel_on(context.clone()).unwrap();
                black_box(stream.sum().unwrap())
            })
        });
    }

    group.finish();
}

fn bench_map_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_scaling");
    group.measurement_time(Duration::from_secs(15));
    group.sample_size(20);

    let data: Vec<u64> = (0..20_000).collect();
    let max_threads = num_cpus::get().min(16);

    for threads in [1, 2, 4, 8, 16].iter().filter(|&&t| t <= max_threads) {
        let context = ExecutionContext::with_config(ExecutionConfig::new().max_threads(*threads));

        group.bench_with_input(BenchmarkId::new("heavy_map_to_vec", threads), threads, |b, _| {
            b.iter(|| {
                let result = RStream::from_vec(data.clone())
                    .parallel_on(context.clone())
                    .unwrap()
                    .map(heavy_task)
                    .to_vec()
                    .unwrap();
                black_box(result)
            })
        });

        group.bench_with_input(BenchmarkId::new("light_map_sum", threads), threads, |b, _| {
            b.iter(|| {
                let result = RStream::from_vec(data.clone())
                    .parallel_on(context.clone())
                    .unwrap()
                    .map(light_task)
                    .fold(0u64, |acc, x| acc.wrapping_add(x), |a, b| a.wrapping_add(b))
                    .unwrap();
                black_box(result)
            })
        });
    }

    group.finish();
}

fn bench_splitors(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitors");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for splitor in [Splitor::Contiguous, Splitor::SharedCursor].iter() {
        let context = ExecutionContext::with_config(ExecutionConfig::new().splitor(*splitor));
        group.bench_with_input(
            BenchmarkId::new("heavy_map_count", format!("{:?}", splitor)),
            splitor,
            |b, _| {
                b.iter(|| {
                    let count = RStream::range(0u64, 20_000)
                        .parallel_on(context.clone())
                        .unwrap()
                        .map(heavy_task)
                        .filter(|x| *x > 100.0)
                        .count()
                        .unwrap();
                    black_box(count)
                })
            },
        );
    }

    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    group.sample_size(20);

    let data: Vec<u64> = (0..200_000u64).map(|x| light_task(x) % 100_000).collect();

    group.bench_function("sequential", |b| {
        b.iter(|| black_box(RStream::from_vec(data.clone()).sorted().to_vec().unwrap()))
    });

    let context = ExecutionContext::with_config(ExecutionConfig::new());
    group.bench_function("parallel", |b| {
        b.iter(|| {
            let stream = RStream::from_vec(data.clone()).parallel_on(context.clone()).unwrap();
            black_box(stream.sorted().to_vec().unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sum, bench_map_scaling, bench_splitors, bench_sort);
criterion_main!(benches);
