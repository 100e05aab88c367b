//! logring - Lock-Free Multi-Producer Single-Consumer Log Ring
//!
//! A bounded MPSC queue of fixed-size event records built for access
//! logging on latency-sensitive request paths. Producers never block and
//! never allocate: a full ring drops the event (`try_write` returns
//! `false`) instead of exerting back-pressure on the request.
//!
//! # Key Features
//!
//! - 128-byte alignment (prefetcher false sharing elimination)
//! - Per-slot EMPTY → WRITING → READY state machine (no producer locks)
//! - Batch consumption API (single tail update for N items)
//! - Drop-on-full producer semantics
//! - Adaptive backoff (spin → yield → capped microsecond sleep)
//!
//! # Example
//!
//! ```
//! use logring::{Config, Ring};
//!
//! let ring = Ring::<u64>::new(Config::default());
//!
//! // Clone the handle into any producing thread; a full or closed ring
//! // drops the event instead of blocking.
//! assert!(ring.try_write(42));
//!
//! // Exactly one consumer drains batches of contiguous slots.
//! let consumer = ring.consumer().unwrap();
//! ring.close();
//! let mut seen = Vec::new();
//! consumer.run(|batch: &[u64]| seen.extend_from_slice(batch));
//! assert_eq!(seen, [42]);
//! ```

mod backoff;
mod config;
mod invariants;
mod metrics;
mod ring;

pub use backoff::Backoff;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ring::{Consumer, PanicHook, Ring, RingError};
