//! Property-based tests for the ring's sequencing invariants.
//!
//! The slot state machine guarantees `0 <= head - tail <= capacity` and
//! exact conservation of accepted writes; proptest drives arbitrary
//! write/drain schedules against those invariants.

use logring::{Config, Ring};
use proptest::prelude::*;

proptest! {
    /// Bounded count: the ring never holds more than capacity, no matter
    /// how writes and drains interleave on one thread.
    #[test]
    fn prop_bounded_count(
        ring_bits in 1u8..6,
        writes in 0usize..200,
    ) {
        let ring = Ring::<u64>::new(Config::new(ring_bits, 128, false));
        let capacity = ring.capacity();

        let mut accepted = 0usize;
        for i in 0..writes {
            if ring.try_write(i as u64) {
                accepted += 1;
            }
            prop_assert!(ring.len() <= capacity,
                "len {} > capacity {}", ring.len(), capacity);
        }

        // Writes past capacity must have been dropped, not queued.
        prop_assert_eq!(accepted, writes.min(capacity));
    }

    /// Conservation: after close, the consumer sees exactly the accepted
    /// writes, in reservation order.
    #[test]
    fn prop_conservation_in_order(
        ring_bits in 1u8..6,
        writes in 0usize..200,
    ) {
        let ring = Ring::<u64>::new(Config::new(ring_bits, 32, false));

        let mut expected = Vec::new();
        for i in 0..writes {
            if ring.try_write(i as u64) {
                expected.push(i as u64);
            }
        }

        let consumer = ring.consumer().unwrap();
        ring.close();
        let mut seen = Vec::new();
        consumer.run(|batch| seen.extend_from_slice(batch));

        prop_assert_eq!(seen, expected);
        prop_assert!(ring.is_empty());
    }

    /// Interleaved write/drain rounds: capacity is reopened by consumption
    /// and nothing is duplicated or lost across the wrap point.
    #[test]
    fn prop_wrap_rounds(
        bursts in prop::collection::vec(1usize..10, 1..20),
    ) {
        let ring = Ring::<u64>::new(Config::new(2, 128, false));
        let mut consumer = ring.consumer().unwrap();

        let mut next = 0u64;
        let mut accepted = Vec::new();
        let mut delivered = Vec::new();

        for burst in bursts {
            for _ in 0..burst {
                if ring.try_write(next) {
                    accepted.push(next);
                }
                next += 1;
            }
            consumer.drain(|batch| delivered.extend_from_slice(batch));
            prop_assert!(ring.is_empty());
        }

        prop_assert_eq!(&delivered, &accepted);
    }
}
