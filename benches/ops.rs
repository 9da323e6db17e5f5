//! Micro-operation benchmarks for the queue.
//!
//! Run with: `cargo bench --bench ops`
//!
//! Measures per-operation latency for push and pop against the standard
//! library's binary heap under identical key streams.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hint::black_box;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use queuekit::queue::pq::PriorityQueue;

const OPS: u64 = 100_000;

fn keys(seed: u64) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..OPS).map(|_| rng.gen_range(1..u64::MAX)).collect()
}

// ============================================================================
// Push Latency (ns/op)
// ============================================================================

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_ns");
    group.throughput(Throughput::Elements(OPS));
    let keys = keys(1);

    group.bench_function("queuekit", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut pq: PriorityQueue<u64> = PriorityQueue::new();
                let start = Instant::now();
                for &k in &keys {
                    pq.push(black_box(k));
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.bench_function("std_binary_heap", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut heap: BinaryHeap<Reverse<u64>> = BinaryHeap::new();
                let start = Instant::now();
                for &k in &keys {
                    heap.push(black_box(Reverse(k)));
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.finish();
}

// ============================================================================
// Push + Drain Latency (ns/op)
// ============================================================================

fn bench_push_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_drain_ns");
    group.throughput(Throughput::Elements(2 * OPS));
    let keys = keys(2);

    group.bench_function("queuekit", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut pq: PriorityQueue<u64> = PriorityQueue::new();
                let start = Instant::now();
                for &k in &keys {
                    pq.push(k);
                }
                while !pq.is_empty() {
                    black_box(pq.pop());
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.bench_function("std_binary_heap", |b| {
        b.iter_custom(|iters| {
            let mut elapsed = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut heap: BinaryHeap<Reverse<u64>> = BinaryHeap::new();
                let start = Instant::now();
                for &k in &keys {
                    heap.push(Reverse(k));
                }
                while let Some(item) = heap.pop() {
                    black_box(item);
                }
                elapsed += start.elapsed();
            }
            elapsed
        })
    });

    group.finish();
}

criterion_group!(benches, bench_push, bench_push_drain);
criterion_main!(benches);
