//! Benchmarks for the signal set hot paths

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use meshrun_sync::{EventFlags, Signal};

fn bench_set_unbound(c: &mut Criterion) {
    let flags = EventFlags::new();

    c.bench_function("flags_set_unbound", |b| {
        b.iter(|| flags.set(black_box(Signal::ACTIVITY_PENDING_FROM_ISR)))
    });
}

fn bench_set_and_take(c: &mut Criterion) {
    let flags = EventFlags::new();
    flags.bind_waiter().unwrap();

    c.bench_function("flags_set_take", |b| {
        b.iter(|| {
            flags.set(Signal::ACTIVITY_PENDING);
            black_box(flags.take())
        })
    });
}

fn bench_saturated_set(c: &mut Criterion) {
    let flags = EventFlags::new();
    flags.bind_waiter().unwrap();
    flags.set(Signal::all());

    c.bench_function("flags_set_saturated", |b| {
        b.iter(|| flags.set(black_box(Signal::ACTIVITY_PENDING)))
    });
}

criterion_group!(benches, bench_set_unbound, bench_set_and_take, bench_saturated_set);
criterion_main!(benches);
