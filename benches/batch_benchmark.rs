use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tokio::runtime::Runtime;
use trybatch::batch::BatchExecutor;
use trybatch::operation::Operation;
use trybatch::ErrorHandler;

fn operations(count: usize) -> Vec<Operation> {
    (0..count)
        .map(|i| {
            Operation::from_fn(move || {
                if i % 10 == 0 {
                    Err(anyhow::anyhow!("operation {i} failed"))
                } else {
                    Ok(vec![json!(i), json!({ "index": i })])
                }
            })
        })
        .collect()
}

fn benchmark_sequential(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let executor = BatchExecutor::new();

    c.bench_function("sequential_batch_100", |b| {
        b.iter(|| {
            let result = rt.block_on(executor.execute(ErrorHandler::ignore(|_| {}), operations(100)));
            black_box(result.values.len())
        })
    });
}

fn benchmark_parallel(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let executor = BatchExecutor::new().with_parallel(true);

    c.bench_function("parallel_batch_100", |b| {
        b.iter(|| {
            let result = rt.block_on(executor.execute(ErrorHandler::ignore(|_| {}), operations(100)));
            black_box(result.values.len())
        })
    });
}

fn benchmark_with_timeout(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let executor = BatchExecutor::new()
        .with_parallel(true)
        .with_timeout(std::time::Duration::from_secs(5));

    c.bench_function("parallel_batch_100_with_timeout", |b| {
        b.iter(|| {
            let result = rt.block_on(executor.execute(ErrorHandler::ignore(|_| {}), operations(100)));
            black_box(result.values.len())
        })
    });
}

criterion_group!(benches, benchmark_sequential, benchmark_parallel, benchmark_with_timeout);
criterion_main!(benches);
