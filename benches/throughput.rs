use batch_pipeline::{BatchPolicy, NoopObserver, PipelineBuilder, PipelineConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;

const FLUSH_INTERVAL: Duration = Duration::from_secs(3600);

/// Feed `0..count` through the pipeline and let `stop` collect the batch.
///
/// The flush interval is long enough that nothing leaves the batching stage
/// before shutdown, so `stop` is the only reader of the output queue.
fn run_to_completion(builder: PipelineBuilder, count: i64, expected: u64) -> usize {
    let mut running = builder
        .with_observer(Arc::new(NoopObserver))
        .build()
        .expect("Build failed")
        .start()
        .expect("Start failed");
    let input = running.take_input().expect("Input taken");
    for i in 0..count {
        let _ = input.send(black_box(i));
    }
    drop(input);

    let last = running.stage_count() - 1;
    let metrics = running.stage_metrics(last).expect("No stages").clone();
    while metrics.total_received() < expected {
        std::hint::spin_loop();
    }

    running.stop().map(|items| items.len()).unwrap_or(0)
}

fn benchmark_default_topology(c: &mut Criterion) {
    c.bench_function("default_topology_1000_items", |b| {
        b.iter(|| {
            let config = PipelineConfig::default()
                .with_buffer_capacity(1000)
                .with_flush_interval(FLUSH_INTERVAL);
            run_to_completion(PipelineBuilder::from_config(&config), 1000, 333)
        });
    });
}

fn benchmark_buffered_links(c: &mut Criterion) {
    c.bench_function("buffered_links_1000_items", |b| {
        b.iter(|| {
            let config = PipelineConfig::default()
                .with_buffer_capacity(1000)
                .with_flush_interval(FLUSH_INTERVAL)
                .with_link_capacity(64);
            run_to_completion(PipelineBuilder::from_config(&config), 1000, 333)
        });
    });
}

fn benchmark_batch_only(c: &mut Criterion) {
    c.bench_function("batch_only_5000_items", |b| {
        b.iter(|| {
            let builder = PipelineBuilder::new().batch(
                "buffer",
                BatchPolicy {
                    capacity: 5000,
                    flush_interval: FLUSH_INTERVAL,
                },
            );
            run_to_completion(builder, 5000, 5000)
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_default_topology, benchmark_buffered_links, benchmark_batch_only
);
criterion_main!(benches);
