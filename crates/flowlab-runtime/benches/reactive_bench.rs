//! Benchmarks for the reactive holders and per-value stages.
//!
//! Run with: cargo bench -p flowlab-runtime

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flowlab_runtime::reactive::{BroadcastLog, Counter, StateCell};
use flowlab_runtime::stages::Stages;
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

fn bench_state_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("reactive/state_set");

    for subscribers in [0usize, 1, 4, 16] {
        let cell = StateCell::new(0u64);
        let hits = Rc::new(Cell::new(0u64));
        let subs: Vec<_> = (0..subscribers)
            .map(|_| {
                let hits = Rc::clone(&hits);
                cell.subscribe(move |v| hits.set(hits.get().wrapping_add(*v)))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &cell,
            |b, cell| {
                let mut next = 0u64;
                b.iter(|| {
                    next = next.wrapping_add(1);
                    cell.set(black_box(next));
                })
            },
        );
        drop(subs);
    }

    group.finish();
}

fn bench_counter_increment(c: &mut Criterion) {
    let counter = Counter::new();
    c.bench_function("reactive/counter_increment", |b| {
        b.iter(|| {
            counter.increment();
            black_box(counter.current_value())
        })
    });
}

fn bench_broadcast_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("reactive/broadcast_emit");

    for capacity in [1usize, 5, 64] {
        let log = BroadcastLog::new(capacity);
        let total = Rc::new(Cell::new(0u64));
        let sink = Rc::clone(&total);
        let _sub = log.subscribe(move |v: &u64| sink.set(sink.get().wrapping_add(*v)));

        group.bench_with_input(BenchmarkId::new("capacity", capacity), &log, |b, log| {
            let mut next = 0u64;
            b.iter(|| {
                next = next.wrapping_add(1);
                log.emit(black_box(next));
            })
        });
    }

    group.finish();
}

fn bench_stages_step(c: &mut Criterion) {
    let mut stages = Stages::new().filter(|v: &u64| v % 2 == 0).map(|v| v * 2);
    c.bench_function("stages/even_doubled_step", |b| {
        let mut next = 0u64;
        b.iter(|| {
            next = next.wrapping_add(1);
            black_box(stages.step(black_box(next)))
        })
    });
}

criterion_group!(
    benches,
    bench_state_set,
    bench_counter_increment,
    bench_broadcast_emit,
    bench_stages_step,
);
criterion_main!(benches);
