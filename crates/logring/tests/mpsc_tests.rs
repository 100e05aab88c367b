//! Multi-producer integration tests for the log ring.

use logring::{Config, Ring, RingError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_multi_producer_conservation() {
    // Every accepted write is delivered exactly once; drops are accounted.
    let ring = Ring::<u64>::new(Config::new(8, 64, true));
    let accepted = Arc::new(AtomicU64::new(0));
    let consumed = Arc::new(AtomicU64::new(0));

    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 10_000;

    let consumer = ring.consumer().unwrap();
    let consumed2 = Arc::clone(&consumed);
    let drainer = thread::spawn(move || {
        let mut last_seen: [Option<u64>; PRODUCERS as usize] = [None; PRODUCERS as usize];
        consumer.run(|batch| {
            for &item in batch {
                let producer = (item >> 32) as usize;
                let seq = item & 0xffff_ffff;
                // Per-producer FIFO: a producer's accepted items arrive in
                // reservation order, which for one thread is send order.
                if let Some(prev) = last_seen[producer] {
                    assert!(seq > prev, "producer {producer} reordered: {prev} then {seq}");
                }
                last_seen[producer] = Some(seq);
                consumed2.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    let mut handles = Vec::new();
    for p in 0..PRODUCERS {
        let ring = ring.clone();
        let accepted = Arc::clone(&accepted);
        handles.push(thread::spawn(move || {
            for i in 0..PER_PRODUCER {
                if ring.try_write((p << 32) | i) {
                    accepted.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    ring.close();
    drainer.join().unwrap();

    let accepted = accepted.load(Ordering::Relaxed);
    let consumed = consumed.load(Ordering::Relaxed);
    assert_eq!(accepted, consumed, "accepted {accepted} != consumed {consumed}");

    let m = ring.metrics();
    assert_eq!(m.events_written, accepted);
    assert_eq!(m.events_consumed, consumed);
    assert_eq!(m.events_written + m.events_dropped, PRODUCERS * PER_PRODUCER);
}

#[test]
fn test_slow_consumer_drops_not_blocks() {
    let ring = Ring::<u64>::new(Config::new(2, 4, true));

    // No consumer running: only `capacity` writes can land.
    let mut ok = 0;
    for i in 0..100u64 {
        if ring.try_write(i) {
            ok += 1;
        }
    }
    assert_eq!(ok, 4);
    assert_eq!(ring.metrics().events_dropped, 96);

    let consumer = ring.consumer().unwrap();
    ring.close();
    let mut seen = Vec::new();
    consumer.run(|batch| seen.extend_from_slice(batch));
    assert_eq!(seen, [0, 1, 2, 3]);
}

#[test]
fn test_batch_limit_respected() {
    let ring = Ring::<u64>::new(Config::new(6, 16, false));
    for i in 0..64u64 {
        assert!(ring.try_write(i));
    }
    let consumer = ring.consumer().unwrap();
    ring.close();

    let mut seen = Vec::new();
    consumer.run(|batch| {
        assert!(batch.len() <= 16);
        seen.extend_from_slice(batch);
    });
    assert_eq!(seen, (0..64).collect::<Vec<_>>());
}

#[test]
fn test_single_consumer_enforced() {
    let ring = Ring::<u64>::new(Config::default());
    let _held = ring.consumer().unwrap();
    assert!(matches!(ring.consumer(), Err(RingError::ConsumerTaken)));
}
