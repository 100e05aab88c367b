use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for ring activity.
///
/// All methods use `Ordering::Relaxed` because these are purely statistical
/// counters: no code path depends on them being up to date, slightly stale
/// reads are fine for observability, and unlike the ring head/tail they
/// guard no other data. Relaxed avoids memory barriers in the write path.
#[derive(Debug, Default)]
pub struct Metrics {
    events_written: AtomicU64,
    events_dropped: AtomicU64,
    events_consumed: AtomicU64,
    batches_consumed: AtomicU64,
    reserve_retries: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_written(&self, n: u64) {
        self.events_written.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dropped(&self, n: u64) {
        self.events_dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_consumed(&self, n: u64) {
        self.events_consumed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_batches(&self, n: u64) {
        self.batches_consumed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_retries(&self, n: u64) {
        self.reserve_retries.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_written: self.events_written.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_consumed: self.events_consumed.load(Ordering::Relaxed),
            batches_consumed: self.batches_consumed.load(Ordering::Relaxed),
            reserve_retries: self.reserve_retries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the ring counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Events accepted by `try_write`
    pub events_written: u64,
    /// Events rejected because the ring was full or closed
    pub events_dropped: u64,
    /// Events handed to the consumer handler
    pub events_consumed: u64,
    /// Consumer batches delivered
    pub batches_consumed: u64,
    /// Head CAS retries across all producers
    pub reserve_retries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counts() {
        let m = Metrics::new();
        m.add_written(3);
        m.add_dropped(1);
        m.add_consumed(3);
        m.add_batches(2);

        let s = m.snapshot();
        assert_eq!(s.events_written, 3);
        assert_eq!(s.events_dropped, 1);
        assert_eq!(s.events_consumed, 3);
        assert_eq!(s.batches_consumed, 2);
    }
}
