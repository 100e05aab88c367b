//! Throughput benchmarks: producer write rate and batched drain rate.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logring::{Config, Ring};
use std::thread;

#[derive(Clone, Copy)]
struct Event {
    _ts: u64,
    _status: u16,
    _bytes: i64,
    _pad: [u8; 48],
}

const EVENT: Event = Event {
    _ts: 0,
    _status: 200,
    _bytes: 512,
    _pad: [0; 48],
};

fn bench_single_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_producer");
    group.throughput(Throughput::Elements(1));

    group.bench_function("try_write_drain", |b| {
        let ring = Ring::<Event>::new(Config::new(12, 128, false));
        let mut consumer = ring.consumer().unwrap();
        b.iter(|| {
            if !ring.try_write(EVENT) {
                consumer.drain(|_| {});
                ring.try_write(EVENT);
            }
        });
    });

    group.finish();
}

fn bench_contended_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_producers");

    for producers in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((producers * 10_000) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let ring = Ring::<Event>::new(Config::new(14, 128, false));
                    let consumer = ring.consumer().unwrap();

                    let mut handles = Vec::new();
                    for _ in 0..producers {
                        let ring = ring.clone();
                        handles.push(thread::spawn(move || {
                            for _ in 0..10_000 {
                                ring.try_write(EVENT);
                            }
                        }));
                    }

                    let drainer = thread::spawn(move || {
                        let mut total = 0usize;
                        consumer.run(|batch| total += batch.len());
                        total
                    });

                    for h in handles {
                        h.join().unwrap();
                    }
                    ring.close();
                    drainer.join().unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_producer, bench_contended_producers);
criterion_main!(benches);
