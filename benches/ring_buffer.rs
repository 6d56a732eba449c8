use batch_pipeline::RingBuffer;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::thread;

fn benchmark_push_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_then_flush");
    for capacity in [5usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            let buffer = RingBuffer::new(cap);
            b.iter(|| {
                for i in 0..cap as i64 {
                    buffer.push(black_box(i));
                }
                black_box(buffer.flush())
            });
        });
    }
    group.finish();
}

fn benchmark_overflow(c: &mut Criterion) {
    c.bench_function("push_overflow_10000_into_5", |b| {
        let buffer = RingBuffer::new(5);
        b.iter(|| {
            for i in 0..10_000i64 {
                black_box(buffer.push(black_box(i)));
            }
            buffer.flush()
        });
    });
}

fn benchmark_contended(c: &mut Criterion) {
    c.bench_function("contended_push_flush", |b| {
        b.iter(|| {
            let buffer = Arc::new(RingBuffer::new(64));
            let pusher = {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..10_000i64 {
                        buffer.push(i);
                    }
                })
            };
            let mut drained = 0;
            while !pusher.is_finished() {
                drained += buffer.flush().len();
            }
            let _ = pusher.join();
            drained + buffer.flush().len()
        });
    });
}

criterion_group!(benches, benchmark_push_flush, benchmark_overflow, benchmark_contended);
criterion_main!(benches);
