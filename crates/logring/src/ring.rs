use crate::invariants::{
    debug_assert_batch_in_range, debug_assert_bounded_count, debug_assert_monotonic,
    debug_assert_state_transition,
};
use crate::{Backoff, Config, Metrics, MetricsSnapshot};
use std::any::Any;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This MPSC ring buffer uses one shared slot array guarded by a per-slot
// state machine, with the following synchronization guarantees:
//
// ## Sequence Numbers (ABA Prevention)
//
// `head` and `tail` are unbounded u64 sequence numbers, never wrapped
// indices. Slot indices are computed as `sequence & mask` only at access
// time, so the ABA problem cannot arise in practice (wrap takes decades).
//
// ## Slot State Protocol
//
// Each slot carries an atomic state with three values:
//
//   EMPTY ──(producer CAS'd head onto this slot)──► WRITING
//   WRITING ──(producer finished the value store)──► READY
//   READY ──(consumer finished reading the slot)──► EMPTY
//
// **Producer (write path):**
// 1. Load `head`/`tail`; if `head - tail >= capacity`, report full
// 2. CAS `head -> head + 1` to reserve exactly one slot (AcqRel)
// 3. Spin until the reserved slot's state is EMPTY (Acquire)
// 4. Store WRITING (Relaxed - slot is now exclusively owned)
// 5. Plain-store the value (no ordering needed - protected by protocol)
// 6. Store READY with Release - THE publication point
//
// **Consumer (read path):**
// 1. Private cursor `curr` starts from `tail` (only the consumer writes tail)
// 2. Load slot state with Acquire; READY synchronizes with step 6 above
// 3. Scan forward while states are READY, bounded by the batch limit
// 4. Hand the batch to the handler as plain `&[T]` slices
// 5. Store EMPTY per slot with Release (hands the slot back to producers)
// 6. Store `tail = curr + batch` with Release (opens capacity)
//
// The value store in step 5 of the producer needs no atomics: between
// WRITING and READY no other producer can reserve the slot (head already
// moved past it and `head - tail <= capacity` keeps the next lap out), and
// the consumer reads it only after observing READY.
//
// =============================================================================

pub(crate) const SLOT_EMPTY: u8 = 0;
pub(crate) const SLOT_WRITING: u8 = 1;
pub(crate) const SLOT_READY: u8 = 2;

/// Callback receiving the payload of a panicking consumer handler.
pub type PanicHook = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;

/// Error types for ring operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// The single consumer handle has already been taken.
    #[error("consumer already taken")]
    ConsumerTaken,
}

/// MPSC ring buffer - a bounded queue of fixed-size event records.
///
/// Multiple producers reserve slots by CAS on the head sequence; a single
/// consumer drains contiguous batches. A full ring rejects writes instead
/// of blocking, which is the right trade for access logging: losing a log
/// line is cheaper than stalling a request.
///
/// The handle is a cheap clone over shared storage; clone it into every
/// producing thread. `T: Copy` keeps slot recycling trivial - events are
/// value-copied in and out and the slot array never owns heap data.
pub struct Ring<T> {
    inner: Arc<RingInner<T>>,
}

impl<T> Clone for Ring<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[repr(C)]
struct RingInner<T> {
    // === PRODUCER HOT === (128-byte aligned)
    /// Head sequence (CAS'd by producers, read by consumer)
    head: CacheAligned<AtomicU64>,

    // === CONSUMER HOT === (128-byte aligned)
    /// Tail sequence (written by consumer, read by producers)
    tail: CacheAligned<AtomicU64>,

    // === COLD STATE === (rarely accessed)
    /// Whether this ring is closed
    closed: AtomicBool,
    /// Whether the single consumer handle has been handed out
    consumer_taken: AtomicBool,
    /// Thread-safe metrics (uses atomics internally)
    metrics: Metrics,

    // === CONFIG ===
    config: Config,

    // === SHARED SLOT STORAGE ===
    /// Per-slot state codes driving the EMPTY/WRITING/READY protocol.
    states: Box<[AtomicU8]>,
    /// The event payload array. Slot `i` is written only by the producer
    /// that reserved it and read only by the consumer, as enforced by
    /// `states[i]`.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: the slot state machine gives each slot exactly one writer between
// EMPTY->READY and exactly one reader between READY->EMPTY. T: Copy implies
// no drop obligations on recycled slots.
unsafe impl<T: Copy + Send> Send for RingInner<T> {}
unsafe impl<T: Copy + Send> Sync for RingInner<T> {}

impl<T: Copy> Ring<T> {
    /// Creates a new ring buffer with the given configuration.
    pub fn new(config: Config) -> Self {
        let capacity = config.capacity();

        let mut states = Vec::with_capacity(capacity);
        states.resize_with(capacity, || AtomicU8::new(SLOT_EMPTY));

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));

        Self {
            inner: Arc::new(RingInner {
                head: CacheAligned::new(AtomicU64::new(0)),
                tail: CacheAligned::new(AtomicU64::new(0)),
                closed: AtomicBool::new(false),
                consumer_taken: AtomicBool::new(false),
                metrics: Metrics::new(),
                config,
                states: states.into_boxed_slice(),
                slots: slots.into_boxed_slice(),
            }),
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.config.capacity()
    }

    /// Returns the current number of published or in-flight items.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.inner.head.load(Ordering::Relaxed);
        let tail = self.inner.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail) as usize
    }

    /// Returns true if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the ring is closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Attempt to enqueue one event without blocking.
    ///
    /// Returns `false` when the ring is closed or full - the event is
    /// dropped. On CAS contention the producer backs off (bounded spin,
    /// then yields, then capped microsecond sleeps) and retries; it never
    /// takes a lock and never waits on the consumer.
    pub fn try_write(&self, item: T) -> bool {
        let inner = &*self.inner;
        let mut backoff = Backoff::new();
        let seq = loop {
            if inner.closed.load(Ordering::Acquire) {
                if inner.config.enable_metrics {
                    inner.metrics.add_dropped(1);
                }
                return false;
            }

            let head = inner.head.load(Ordering::Acquire);
            let tail = inner.tail.load(Ordering::Acquire);
            if head.wrapping_sub(tail) >= inner.config.capacity() as u64 {
                if inner.config.enable_metrics {
                    inner.metrics.add_dropped(1);
                }
                return false;
            }

            match inner.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug_assert_bounded_count!(
                        head.wrapping_add(1).wrapping_sub(tail) as usize,
                        inner.config.capacity()
                    );
                    break head;
                }
                Err(_) => {
                    if inner.config.enable_metrics {
                        inner.metrics.add_retries(1);
                    }
                    backoff.snooze();
                }
            }
        };

        // The reservation guarantees the previous lap of this slot has been
        // consumed; the spin covers the window where the consumer has not
        // yet stored EMPTY.
        let mut spin = Backoff::new();
        loop {
            let state = inner.state(seq).load(Ordering::Acquire);
            if state == SLOT_EMPTY {
                debug_assert_state_transition!(state, SLOT_WRITING);
                break;
            }
            spin.snooze();
        }
        inner.state(seq).store(SLOT_WRITING, Ordering::Relaxed);

        // SAFETY: between WRITING and READY this producer is the only
        // party touching the slot; see the protocol comment above.
        unsafe {
            (*inner.slots[(seq as usize) & inner.config.mask()].get()).write(item);
        }

        debug_assert_state_transition!(SLOT_WRITING, SLOT_READY);
        inner.state(seq).store(SLOT_READY, Ordering::Release);

        if inner.config.enable_metrics {
            inner.metrics.add_written(1);
        }
        true
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Close the ring. Producers observe the flag and drop subsequent
    /// writes; the consumer drains what was already published, then exits.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    /// Take the single consumer handle.
    ///
    /// Exactly one call succeeds for the lifetime of the ring; cloning a
    /// consumer is impossible, which is what makes the consume path safe
    /// without a lock.
    pub fn consumer(&self) -> Result<Consumer<T>, RingError> {
        if self.inner.consumer_taken.swap(true, Ordering::AcqRel) {
            return Err(RingError::ConsumerTaken);
        }
        let curr = self.inner.tail.load(Ordering::Relaxed);
        Ok(Consumer {
            inner: Arc::clone(&self.inner),
            panic_hook: None,
            curr,
        })
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.inner.config.enable_metrics {
            self.inner.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<T> RingInner<T> {
    #[inline]
    fn state(&self, seq: u64) -> &AtomicU8 {
        &self.states[(seq as usize) & self.config.mask()]
    }
}

/// Single-consumer handle draining the ring in batches.
///
/// Obtained once via [`Ring::consumer`]; intentionally not `Clone`.
pub struct Consumer<T: Copy> {
    inner: Arc<RingInner<T>>,
    panic_hook: Option<PanicHook>,
    /// Private cursor; trails `tail` only inside a batch.
    curr: u64,
}

impl<T: Copy> Consumer<T> {
    /// Install a hook receiving handler panic payloads. Without a hook a
    /// handler panic is rethrown and terminates the consumer.
    pub fn with_panic_hook(mut self, hook: PanicHook) -> Self {
        self.panic_hook = Some(hook);
        self
    }

    /// Consume at most one batch of consecutive READY slots.
    ///
    /// Returns the number of slots recycled (0 when nothing is published).
    fn consume_one_batch<F>(&mut self, handler: &mut F) -> usize
    where
        F: FnMut(&[T]),
    {
        let inner = &*self.inner;
        if inner.state(self.curr).load(Ordering::Acquire) != SLOT_READY {
            return 0;
        }

        let mask = inner.config.mask();
        let capacity = inner.config.capacity();
        let batch_limit = inner.config.effective_batch();

        // Scan forward while slots are published, up to the batch limit.
        let mut available = 1usize;
        while available < batch_limit
            && inner
                .state(self.curr.wrapping_add(available as u64))
                .load(Ordering::Acquire)
                == SLOT_READY
        {
            available += 1;
        }

        debug_assert_batch_in_range!(self.curr, available, inner.head.load(Ordering::Acquire));

        let idx = (self.curr as usize) & mask;
        let first = available.min(capacity - idx);
        let second = available - first;

        // SAFETY: slots [curr, curr+available) are READY, so each holds a
        // fully initialized T and no producer touches it until we store
        // EMPTY. UnsafeCell<MaybeUninit<T>> has the same layout as T. A
        // batch across the wrap point is delivered as two slices in
        // physical order, never one aliased or out-of-bounds slice.
        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            let base = inner.slots.as_ptr().cast::<T>();
            handler(std::slice::from_raw_parts(base.add(idx), first));
            if second > 0 {
                handler(std::slice::from_raw_parts(base, second));
            }
        }));

        // Recycle the batch whether or not the handler panicked; with a
        // hook installed the consumer keeps running and must not redeliver
        // these slots.
        for i in 0..available {
            let seq = self.curr.wrapping_add(i as u64);
            debug_assert_state_transition!(SLOT_READY, SLOT_EMPTY);
            inner.state(seq).store(SLOT_EMPTY, Ordering::Release);
        }
        let new_tail = self.curr.wrapping_add(available as u64);
        debug_assert_monotonic!("tail", self.curr, new_tail);
        inner.tail.store(new_tail, Ordering::Release);
        self.curr = new_tail;

        if inner.config.enable_metrics {
            inner.metrics.add_consumed(available as u64);
            inner.metrics.add_batches(1);
        }

        if let Err(payload) = result {
            match &self.panic_hook {
                Some(hook) => hook(payload),
                None => resume_unwind(payload),
            }
        }

        available
    }

    /// Non-blocking pass: consume everything currently published.
    ///
    /// Returns the total number of slots recycled.
    pub fn drain<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(&[T]),
    {
        let mut total = 0;
        loop {
            let n = self.consume_one_batch(&mut handler);
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    /// Drain the ring until it is closed and empty.
    ///
    /// Batches of up to `min(batch_limit, capacity)` consecutive READY
    /// slots are handed to `handler` as contiguous slices; a batch that
    /// straddles the wrap point arrives as two calls in physical order.
    /// The handler must not retain the slice beyond the call - the slots
    /// are recycled as soon as it returns.
    pub fn run<F>(mut self, mut handler: F)
    where
        F: FnMut(&[T]),
    {
        let mut idle = Backoff::new();
        loop {
            if self.inner.closed.load(Ordering::Acquire)
                && self.inner.head.load(Ordering::Acquire) == self.curr
            {
                return;
            }

            if self.consume_one_batch(&mut handler) > 0 {
                idle.reset();
                continue;
            }

            if self.inner.state(self.curr).load(Ordering::Acquire) == SLOT_WRITING {
                // A producer owns the slot and is about to publish.
                thread::yield_now();
            } else {
                idle.snooze();
            }
        }
    }
}

// ---------------------------------------------------------------------
// HELPER: 128-byte cache-aligned wrapper
// ---------------------------------------------------------------------

/// Wrapper type that ensures 128-byte alignment to prevent
/// prefetcher-induced false sharing on Intel/AMD CPUs (which may prefetch
/// adjacent cache lines).
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
