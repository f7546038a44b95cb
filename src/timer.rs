//! # Tick Subsystem
//!
//! Driven by the port's periodic timer every `TICK_PERIOD_US`. Each tick:
//! 1. Counts down every sleeping thread; those reaching zero become Ready
//! 2. Charges the elapsed time against the running thread's time slice
//! 3. Preempts when the slice is used up, or when a thread that just woke
//!    outranks whatever is running (including the idle context)
//!
//! This is the only source of involuntary preemption.

use crate::config::TICK_PERIOD_US;
use crate::port::Port;
use crate::scheduler::{Context, Scheduler};
use crate::sync;

/// Ticks to sleep for `duration_ms`.
///
/// The call lands somewhere inside a tick period, so the first countdown
/// tick may arrive almost immediately. One extra tick keeps the thread from
/// waking before the full duration has passed.
pub(crate) fn sleep_ticks(duration_ms: u32) -> u32 {
    let period = u64::from(TICK_PERIOD_US);
    let duration_us = u64::from(duration_ms) * 1000;
    let ticks = (duration_us + period - 1) / period + 1;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

impl<P: Port> Scheduler<P> {
    /// Record the time slice and configure the hardware timer to tick every
    /// `TICK_PERIOD_US`. The timer is started separately by the port.
    pub fn tick_init(&mut self, time_slice_us: u32) {
        self.time_slice_us = time_slice_us;
        self.port.tick_init(TICK_PERIOD_US);
    }

    /// Timer interrupt entry point: advance the clock by one tick period.
    pub fn tick(&mut self) {
        sync::critical_section(|_cs| {
            self.ticks += 1;
            let now = self.now_us + u64::from(TICK_PERIOD_US);
            self.timer_tick(now);
        })
    }

    /// Per-tick bookkeeping at `now_us` (microseconds since `run()`).
    pub fn timer_tick(&mut self, now_us: u64) {
        sync::critical_section(|_cs| {
            self.now_us = now_us;
            if !self.started {
                return;
            }

            let mut woken: Option<usize> = None;
            for index in 0..self.threads.len() {
                if self.threads[index].tick_sleep() {
                    let better = match woken {
                        Some(w) => self.threads[index].priority > self.threads[w].priority,
                        None => true,
                    };
                    if better {
                        woken = Some(index);
                    }
                }
            }

            let preempt = match self.current {
                Context::Thread(_) => {
                    let elapsed = now_us.saturating_sub(self.slice_start_us);
                    elapsed >= u64::from(self.time_slice_us)
                        || woken.map_or(false, |w| self.outranks_current(w))
                }
                Context::Idle => self.threads.iter().any(|t| t.is_ready()),
            };

            if preempt {
                self.schedule();
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, check_invariants};
    use crate::thread::ThreadState;

    #[test]
    fn test_sleep_ticks_conversion() {
        assert_eq!(sleep_ticks(1), 2);
        assert_eq!(sleep_ticks(50), 51);
        assert_eq!(sleep_ticks(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_sleep_50ms_timing() {
        // A busy high-priority thread keeps the sleeper honest: waking up
        // must make it Ready, not necessarily Running.
        let (mut k, ids) = testing::running(&[1, 2], 1_000_000);
        assert_eq!(k.current(), Some(ids[1]));
        k.sleep(50);
        assert_eq!(k.current(), Some(ids[0]));
        k.sleep(50);

        for n in 1..=50 {
            k.tick();
            assert!(
                matches!(k.state(ids[0]), ThreadState::Sleeping { .. }),
                "woke after {n} ticks"
            );
        }
        k.tick();
        // Both woke on tick 51; the higher priority one runs
        assert_eq!(k.state(ids[0]), ThreadState::Ready);
        assert_eq!(k.current(), Some(ids[1]));
        check_invariants(&k);
    }

    #[test]
    fn test_slice_expiry_preempts() {
        let (mut k, ids) = testing::running(&[1, 1], 3000);
        assert_eq!(k.current(), Some(ids[0]));
        k.tick();
        k.tick();
        assert_eq!(k.current(), Some(ids[0]));
        k.tick();
        assert_eq!(k.current(), Some(ids[1]));
        assert_eq!(k.state(ids[0]), ThreadState::Ready);
        assert_eq!(k.ticks(), 3);
    }

    #[test]
    fn test_yield_restarts_slice() {
        let (mut k, ids) = testing::running(&[1, 1], 3000);
        k.tick();
        k.tick();
        k.yield_now();
        assert_eq!(k.current(), Some(ids[1]));
        // ids[1] gets a full slice from here
        k.tick();
        k.tick();
        assert_eq!(k.current(), Some(ids[1]));
        k.tick();
        assert_eq!(k.current(), Some(ids[0]));
    }

    #[test]
    fn test_wake_preempts_lower_priority() {
        let (mut k, ids) = testing::running(&[1, 5], 1_000_000);
        k.sleep(1);
        assert_eq!(k.current(), Some(ids[0]));
        k.tick();
        assert_eq!(k.current(), Some(ids[0]));
        k.tick();
        assert_eq!(k.current(), Some(ids[1]));
        assert_eq!(k.state(ids[0]), ThreadState::Ready);
    }

    #[test]
    fn test_tick_before_run_only_advances_clock() {
        let (mut k, ids) = testing::registered(&[1]);
        k.tick();
        assert_eq!(k.ticks(), 1);
        assert_eq!(k.state(ids[0]), ThreadState::Ready);
        assert_eq!(k.port.switch_requests, 0);
    }
}
