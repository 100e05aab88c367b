use std::hint;
use std::thread;
use std::time::Duration;

/// Escalation phases of a wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Busy-spin with PAUSE hints, doubling each round.
    Spin,
    /// Give the scheduler a chance.
    Yield,
    /// Exponential microsecond sleeps, capped at a ceiling.
    Sleep,
}

/// Adaptive backoff: spin → yield → capped microsecond sleeps.
///
/// Producers use it between head-CAS retries; the consumer uses it while
/// the ring is idle. The sleep ceiling keeps worst-case producer stalls
/// well under a millisecond.
#[derive(Debug)]
pub struct Backoff {
    phase: Phase,
    round: u32,
}

/// Spin rounds before yielding (2^5 = 32 pauses on the last one).
const SPIN_ROUNDS: u32 = 5;
/// Yield rounds before sleeping.
const YIELD_ROUNDS: u32 = 4;
/// Per-wait sleep cap in microseconds.
const SLEEP_CEILING_US: u64 = 256;

impl Backoff {
    #[inline]
    pub fn new() -> Self {
        Self {
            phase: Phase::Spin,
            round: 0,
        }
    }

    /// Light spin only; never yields or sleeps.
    #[inline]
    pub fn spin(&mut self) {
        for _ in 0..(1u32 << self.round.min(SPIN_ROUNDS)) {
            hint::spin_loop();
        }
        self.round = self.round.saturating_add(1);
    }

    /// One escalation step through the spin/yield/sleep phases.
    #[inline]
    pub fn snooze(&mut self) {
        match self.phase {
            Phase::Spin => {
                self.spin();
                if self.round > SPIN_ROUNDS {
                    self.phase = Phase::Yield;
                    self.round = 0;
                }
            }
            Phase::Yield => {
                thread::yield_now();
                self.round += 1;
                if self.round >= YIELD_ROUNDS {
                    self.phase = Phase::Sleep;
                    self.round = 0;
                }
            }
            Phase::Sleep => {
                let us = (1u64 << self.round.min(8)).min(SLEEP_CEILING_US);
                thread::sleep(Duration::from_micros(us));
                self.round = self.round.saturating_add(1);
            }
        }
    }

    /// Back to the spin phase for the next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.phase = Phase::Spin;
        self.round = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_escalate_in_order() {
        let mut b = Backoff::new();
        assert_eq!(b.phase, Phase::Spin);

        // Enough snoozes walk through yield into the sleep phase.
        for _ in 0..SPIN_ROUNDS + YIELD_ROUNDS + 4 {
            b.snooze();
        }
        assert_eq!(b.phase, Phase::Sleep);

        b.reset();
        assert_eq!(b.phase, Phase::Spin);
        assert_eq!(b.round, 0);
    }

    #[test]
    fn test_spin_never_changes_phase() {
        let mut b = Backoff::new();
        for _ in 0..50 {
            b.spin();
        }
        assert_eq!(b.phase, Phase::Spin);
    }
}
