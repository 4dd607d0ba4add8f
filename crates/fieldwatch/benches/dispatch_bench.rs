//! Benchmarks for intercepted writes and deferred delivery.
//!
//! Run with: `cargo bench --package fieldwatch --bench dispatch_bench`

use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fieldwatch::{Record, Registry};

fn wide_record(fields: usize) -> Record {
    (0..fields).fold(Record::new(), |r, i| r.with(&format!("f{i}"), i as i64))
}

fn bench_write_and_deliver(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_and_deliver");

    for subscribers in [0usize, 1, 8, 64] {
        let registry = Registry::new();
        let record = wide_record(8);
        registry.make_observable(&record, &[]);
        let hits = Rc::new(Cell::new(0u64));
        let _disposers: Vec<_> = (0..subscribers)
            .map(|_| {
                let hits = Rc::clone(&hits);
                registry.observe(&record, move |_| hits.set(hits.get() + 1))
            })
            .collect();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &record,
            |b, record| {
                let mut v = 0i64;
                b.iter(|| {
                    v += 1;
                    record.set("f3", black_box(v));
                    registry.run_pending();
                });
            },
        );
    }
    group.finish();
}

fn bench_plain_vs_intercepted_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    let plain = wide_record(8);
    group.bench_function("plain", |b| {
        let mut v = 0i64;
        b.iter(|| {
            v += 1;
            plain.set("f3", black_box(v));
        });
    });

    let registry = Registry::new();
    let intercepted = wide_record(8);
    registry.make_observable(&intercepted, &[]);
    group.bench_function("intercepted_no_subscribers", |b| {
        let mut v = 0i64;
        b.iter(|| {
            v += 1;
            intercepted.set("f3", black_box(v));
            registry.run_pending();
        });
    });
    group.finish();
}

fn bench_observe_dispose(c: &mut Criterion) {
    c.bench_function("observe_dispose", |b| {
        let registry = Registry::new();
        let record = wide_record(8);
        b.iter(|| {
            let d = registry.observe(&record, |_| {});
            d.dispose();
            registry.run_pending();
        });
    });
}

criterion_group!(
    benches,
    bench_write_and_deliver,
    bench_plain_vs_intercepted_write,
    bench_observe_dispose
);
criterion_main!(benches);
