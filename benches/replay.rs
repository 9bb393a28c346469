//! Criterion harness for replay latency.
//!
//! Covered paths: add at a resting price, add that opens a fresh
//! level, cancel out of a held-depth book, the three modify variants
//! (in-place, requeue, reshape), and a mixed capture-shaped workload.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use replay_lob::{Message, OrderBook, Side};

/// Generate a random add message in a tight price band
fn random_add(rng: &mut ChaCha8Rng, id: u64, timestamp: u64) -> Message {
    Message::add(
        id,
        timestamp,
        rng.gen_range(9_900..10_100),
        rng.gen_range(1..1_000),
        if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask },
    )
}

/// Benchmark: add then cancel, steady-state pair
fn bench_add_cancel_pair(c: &mut Criterion) {
    let mut book = OrderBook::with_capacity(1_000, 100_000);
    book.warm_up();

    // Resting background liquidity so levels never empty out
    for i in 0..1_000u64 {
        book.process(Message::add(i, i, 9_900 + (i % 200) as i32, 100, Side::Bid)).unwrap();
    }

    let mut id = 1_000u64;

    c.bench_function("add_cancel_pair", |b| {
        b.iter(|| {
            id += 1;
            let price = 9_900 + (id % 200) as i32;
            book.process(Message::add(id, id, price, 100, Side::Bid)).unwrap();
            black_box(book.process(Message::cancel(id, id, price, 100, Side::Bid)).unwrap())
        })
    });
}

/// Benchmark: add that opens (and cancel that closes) a price level
fn bench_level_open_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_open_close");

    for depth in [10usize, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let mut book = OrderBook::with_capacity(depth + 1, 100_000);
            book.warm_up();

            for i in 0..depth as u64 {
                book.process(Message::add(i, i, 10_000 + i as i32, 100, Side::Ask)).unwrap();
            }

            let mut id = 1_000_000u64;
            let fresh_price = 9_999; // better than every resting ask

            b.iter(|| {
                id += 1;
                book.process(Message::add(id, id, fresh_price, 50, Side::Ask)).unwrap();
                black_box(book.process(Message::cancel(id, id, fresh_price, 50, Side::Ask)).unwrap())
            })
        });
    }

    group.finish();
}

/// Benchmark: modify keeping queue position (size shrink)
fn bench_modify_in_place(c: &mut Criterion) {
    let mut book = OrderBook::with_capacity(16, 1_024);
    book.process(Message::add(1, 0, 10_000, 1_000, Side::Bid)).unwrap();

    let mut timestamp = 0u64;
    let mut size = 1_000u32;

    c.bench_function("modify_in_place", |b| {
        b.iter(|| {
            timestamp += 1;
            // Alternate shrink and grow so sizes stay bounded; the
            // grow iterations take the requeue path
            size = if size > 500 { size - 1 } else { 1_000 };
            black_box(book.process(Message::modify(1, timestamp, 10_000, size, Side::Bid)).unwrap())
        })
    });
}

/// Benchmark: modify that moves the order between two price levels
fn bench_modify_reshape(c: &mut Criterion) {
    let mut book = OrderBook::with_capacity(16, 1_024);
    // Anchor orders keep both levels alive across the flip
    book.process(Message::add(1, 0, 10_000, 100, Side::Bid)).unwrap();
    book.process(Message::add(2, 0, 10_001, 100, Side::Bid)).unwrap();
    book.process(Message::add(3, 0, 10_000, 50, Side::Bid)).unwrap();

    let mut timestamp = 0u64;
    let mut at_upper = false;

    c.bench_function("modify_reshape", |b| {
        b.iter(|| {
            timestamp += 1;
            at_upper = !at_upper;
            let price = if at_upper { 10_001 } else { 10_000 };
            black_box(book.process(Message::modify(3, timestamp, price, 50, Side::Bid)).unwrap())
        })
    });
}

/// Benchmark: cancel out of a book held at constant depth
fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");

    for resting in [256u64, 2_048, 16_384].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(resting), resting, |b, &resting| {
            let mut book = OrderBook::with_capacity(128, 100_000);
            book.warm_up();

            let price_of = |id: u64| 9_500 + (id % 64) as i32;
            let side_of = |id: u64| if id % 2 == 0 { Side::Bid } else { Side::Ask };

            for id in 0..resting {
                book.process(Message::add(id, id, price_of(id), 100, side_of(id))).unwrap();
            }

            // Rolling window: retire the oldest order, admit a new one
            let mut oldest = 0u64;
            let mut newest = resting;

            b.iter(|| {
                let out =
                    book.process(Message::cancel(oldest, 0, price_of(oldest), 0, side_of(oldest)));
                book.process(Message::add(newest, 0, price_of(newest), 100, side_of(newest)))
                    .unwrap();
                oldest += 1;
                newest += 1;
                black_box(out)
            })
        });
    }

    group.finish();
}

/// Benchmark: mixed workload shaped like a real capture
fn bench_mixed_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_replay");

    // 60% add, 25% cancel, 15% modify
    group.bench_function("60_add_25_cancel_15_modify", |b| {
        let mut book = OrderBook::with_capacity(1_000, 100_000);
        book.warm_up();

        let mut rng = ChaCha8Rng::seed_from_u64(0xDEADBEEF);
        let mut active: Vec<(u64, Side, i32)> = Vec::new();
        let mut next_id = 0u64;
        let mut timestamp = 0u64;

        // Seed resting liquidity before timing starts
        for _ in 0..1_000 {
            let msg = random_add(&mut rng, next_id, timestamp);
            book.process(msg).unwrap();
            active.push((msg.id, msg.side, msg.price));
            next_id += 1;
        }

        b.iter(|| {
            timestamp += 1;
            let roll: f64 = rng.gen();
            if active.is_empty() || roll < 0.60 {
                let msg = random_add(&mut rng, next_id, timestamp);
                next_id += 1;
                active.push((msg.id, msg.side, msg.price));
                black_box(book.process(msg).unwrap())
            } else if roll < 0.85 {
                let idx = rng.gen_range(0..active.len());
                let (id, side, price) = active.swap_remove(idx);
                black_box(book.process(Message::cancel(id, timestamp, price, 0, side)).unwrap())
            } else {
                let idx = rng.gen_range(0..active.len());
                let (id, side, _) = active[idx];
                let price = rng.gen_range(9_900..10_100);
                let size = rng.gen_range(1..1_000);
                active[idx].2 = price;
                black_box(book.process(Message::modify(id, timestamp, price, size, side)).unwrap())
            }
        })
    });

    group.finish();
}

/// Benchmark: throughput over a pre-generated message tape
fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.throughput(criterion::Throughput::Elements(1_000));

    group.bench_function("1000_messages", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(0xCAFEBABE);
        let tape: Vec<Message> = (0..1_000u64)
            .map(|i| random_add(&mut rng, i, i))
            .collect();

        b.iter_batched_ref(
            || OrderBook::with_capacity(256, 2_048),
            |book| {
                for msg in &tape {
                    black_box(book.process(*msg).unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_add_cancel_pair,
    bench_level_open_close,
    bench_modify_in_place,
    bench_modify_reshape,
    bench_cancel,
    bench_mixed_replay,
    bench_throughput,
);

criterion_main!(benches);
