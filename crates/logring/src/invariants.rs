//! Debug assertion macros for ring buffer invariants.
//!
//! Runtime checks for the invariants of the slot-state protocol. Only
//! active in debug builds (`#[cfg(debug_assertions)]`), zero overhead in
//! release builds.

/// Assert that the item count does not exceed capacity.
///
/// **Invariant**: `0 ≤ (head - tail) ≤ capacity`
///
/// Used in: `try_write()` after a successful reservation
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded-count violated: {} items exceed capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that a sequence number only increases.
///
/// **Invariant**: `new ≥ old` for both head and tail
///
/// Used in: consumer tail publication
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "monotonic-progress violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert a legal slot-state transition.
///
/// **Invariant**: EMPTY → WRITING (producer), WRITING → READY (producer),
/// READY → EMPTY (consumer); nothing else.
///
/// Used in: producer publish path, consumer release path
macro_rules! debug_assert_state_transition {
    ($from:expr, $to:expr) => {
        debug_assert!(
            matches!(
                ($from, $to),
                (
                    $crate::ring::SLOT_EMPTY,
                    $crate::ring::SLOT_WRITING
                ) | (
                    $crate::ring::SLOT_WRITING,
                    $crate::ring::SLOT_READY
                ) | ($crate::ring::SLOT_READY, $crate::ring::SLOT_EMPTY)
            ),
            "illegal slot state transition {} -> {}",
            $from,
            $to
        )
    };
}

/// Assert that a consumed batch lies within the published range.
///
/// **Invariant**: `tail ≤ curr` and `curr + available ≤ head`
///
/// Used in: `Consumer::run()` before delivering a batch
macro_rules! debug_assert_batch_in_range {
    ($curr:expr, $available:expr, $head:expr) => {
        debug_assert!(
            $curr.wrapping_add($available as u64) <= $head,
            "batch out of range: curr {} + {} extends past head {}",
            $curr,
            $available,
            $head
        )
    };
}

pub(crate) use debug_assert_batch_in_range;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_state_transition;
