//! # Counting Semaphore
//!
//! The kernel's only blocking primitive. A positive value is the number of
//! `wait` calls that succeed immediately; a value `-n` means `n` threads are
//! blocked on the semaphore. There is no wait queue: waiters are found by
//! scanning the registry for threads blocked on this semaphore's identity,
//! using the same priority/rotation rule as the scheduler.

use core::sync::atomic::{AtomicI32, Ordering};

use crate::port::Port;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::thread::{SemaphoreId, ThreadState};

/// Counting semaphore, usually declared as a `static`.
///
/// The counter is only modified inside critical sections; the atomic is
/// there so a `static Semaphore` is `Sync` without `unsafe`.
#[derive(Debug)]
pub struct Semaphore {
    value: AtomicI32,
}

impl Semaphore {
    /// Create a semaphore with the given initial value.
    pub const fn new(initial: i32) -> Self {
        Self {
            value: AtomicI32::new(initial),
        }
    }

    /// Reset the counter. Reusing a semaphore that still has blocked waiters
    /// leaves them blocked; that is the caller's responsibility.
    pub fn init(&self, value: i32) {
        sync::critical_section(|_cs| self.value.store(value, Ordering::Relaxed));
    }

    /// Current counter value.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Relaxed)
    }

    pub(crate) fn id(&self) -> SemaphoreId {
        SemaphoreId(self as *const Semaphore as usize)
    }
}

impl<P: Port> Scheduler<P> {
    /// Increment `sem`, waking one waiter if any were blocked.
    ///
    /// The woken thread is the highest-priority waiter, first in rotation
    /// order on ties. If it outranks the running thread the scheduler runs
    /// right away. Safe to call from interrupt handlers.
    pub fn signal(&mut self, sem: &Semaphore) {
        sync::critical_section(|_cs| {
            // Saturates at i32::MAX
            let prev = sem.value();
            sem.value.store(prev.saturating_add(1), Ordering::Relaxed);
            if prev >= 0 {
                return;
            }

            let id = sem.id();
            if let Some(index) = self.select(|t| t.is_blocked_on(id)) {
                self.threads[index].state = ThreadState::Ready;
                log::trace!("signal woke thread {}", index);
                if self.started && self.outranks_current(index) {
                    self.schedule();
                }
            }
        })
    }

    /// Decrement `sem`, blocking the calling thread while the result is
    /// negative.
    ///
    /// Returns once the semaphore was acquired, either immediately or after
    /// a matching `signal` woke the thread and it was scheduled again.
    pub fn wait(&mut self, sem: &Semaphore) {
        sync::critical_section(|_cs| {
            let value = sem.value().saturating_sub(1);
            sem.value.store(value, Ordering::Relaxed);
            if value >= 0 {
                return;
            }

            if !self.block_current(sem.id()) {
                log::error!("wait() would block outside a running thread");
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
    use quickcheck_macros::quickcheck;

    fn leak_semaphore(initial: i32) -> &'static Semaphore {
        Box::leak(Box::new(Semaphore::new(initial)))
    }

    #[test]
    fn test_init_and_value() {
        let sem = Semaphore::new(3);
        assert_eq!(sem.value(), 3);
        sem.init(-1);
        assert_eq!(sem.value(), -1);
    }

    #[test]
    fn test_counter_saturates_at_bounds() {
        let (mut k, ids) = testing::running(&[1], 10_000);

        let full = leak_semaphore(i32::MAX);
        k.signal(full);
        assert_eq!(full.value(), i32::MAX);
        assert_eq!(k.state(ids[0]), ThreadState::Running);

        // Not started yet, so waiting only decrements
        let (mut idle, _) = testing::registered(&[1]);
        let empty = leak_semaphore(i32::MIN);
        idle.wait(empty);
        assert_eq!(empty.value(), i32::MIN);
    }

    #[test]
    fn test_wait_blocks_and_signal_wakes() {
        // Scenario: A waits on an empty semaphore, B signals it later
        let sem = leak_semaphore(0);
        let (mut k, ids) = testing::running(&[1, 1], 10_000);
        let (a, b) = (ids[0], ids[1]);

        k.wait(sem);
        assert_eq!(k.state(a), ThreadState::Blocked { on: sem.id() });
        assert_eq!(k.current(), Some(b));
        assert_eq!(sem.value(), -1);
        check_invariants(&k);

        k.signal(sem);
        assert_eq!(k.state(a), ThreadState::Ready);
        assert_eq!(sem.value(), 0);
        // Equal priority: B keeps the CPU until it yields
        assert_eq!(k.current(), Some(b));

        k.yield_now();
        assert_eq!(k.current(), Some(a));
        check_invariants(&k);
    }

    #[test]
    fn test_initial_count_admits_that_many() {
        let sem = leak_semaphore(2);
        let (mut k, ids) = testing::running(&[1, 1, 1], 10_000);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        k.wait(sem);
        assert_eq!(k.current(), Some(a));
        k.yield_now();
        k.wait(sem);
        assert_eq!(k.current(), Some(b));
        assert_eq!(sem.value(), 0);
        k.yield_now();

        k.wait(sem);
        assert_eq!(k.state(c), ThreadState::Blocked { on: sem.id() });
        assert_eq!(k.current(), Some(a));

        k.signal(sem);
        assert_eq!(k.state(c), ThreadState::Ready);
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_signal_wakes_highest_priority_waiter_once() {
        let sem = leak_semaphore(0);
        // Signaller at 4, waiters at 1, 3, 3
        let (mut k, ids) = testing::running(&[4, 1, 3, 3], 10_000);
        k.sleep(10);
        for _ in 0..3 {
            k.wait(sem);
        }
        assert_eq!(k.current(), None);
        assert_eq!(sem.value(), -3);

        while k.current() != Some(ids[0]) {
            k.tick();
        }

        k.signal(sem);
        assert_eq!(k.state(ids[2]), ThreadState::Ready);
        assert_eq!(k.state(ids[3]), ThreadState::Blocked { on: sem.id() });
        assert_eq!(k.state(ids[1]), ThreadState::Blocked { on: sem.id() });

        k.signal(sem);
        assert_eq!(k.state(ids[3]), ThreadState::Ready);
        assert_eq!(k.state(ids[1]), ThreadState::Blocked { on: sem.id() });

        k.signal(sem);
        assert_eq!(k.state(ids[1]), ThreadState::Ready);
        assert_eq!(sem.value(), 0);
        // The signaller still outranks everyone it woke
        assert_eq!(k.current(), Some(ids[0]));
    }

    #[test]
    fn test_signal_preempts_for_higher_priority_waiter() {
        let sem = leak_semaphore(0);
        let (mut k, ids) = testing::running(&[1, 5], 10_000);
        k.wait(sem);
        assert_eq!(k.current(), Some(ids[0]));

        // e.g. from an interrupt handler while the low thread runs
        k.signal(sem);
        assert_eq!(k.current(), Some(ids[1]));
        assert_eq!(k.state(ids[0]), ThreadState::Ready);
    }

    #[test]
    fn test_signal_while_idle_resumes_waiter() {
        let sem = leak_semaphore(0);
        let (mut k, ids) = testing::running(&[1], 10_000);
        k.wait(sem);
        assert_eq!(k.current(), None);

        k.signal(sem);
        assert_eq!(k.current(), Some(ids[0]));
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_waiters_on_other_semaphores_stay_blocked() {
        let first = leak_semaphore(0);
        let second = leak_semaphore(0);
        let (mut k, ids) = testing::running(&[1, 1, 1], 10_000);
        k.wait(first);
        k.wait(second);
        k.signal(second);
        assert_eq!(k.state(ids[0]), ThreadState::Blocked { on: first.id() });
        assert_eq!(k.state(ids[1]), ThreadState::Ready);
        assert_eq!(first.value(), -1);
    }

    #[quickcheck]
    fn prop_semaphore_conservation(initial: u8, threads: u8, ops: Vec<u8>) -> bool {
        let initial = i32::from(initial % 4);
        let count = usize::from(threads % 4) + 1;
        let sem = leak_semaphore(initial);
        let priorities: Vec<u8> = (0..count as u8).map(|i| i % 2).collect();
        let (mut k, _) = testing::running(&priorities, 2000);

        let (mut signals, mut waits) = (0i32, 0i32);
        for op in ops {
            match op % 4 {
                0 => {
                    if k.current().is_some() {
                        k.wait(sem);
                        waits += 1;
                    }
                }
                1 => {
                    k.signal(sem);
                    signals += 1;
                }
                2 => k.yield_now(),
                _ => k.tick(),
            }

            let blocked = k
                .threads
                .iter()
                .filter(|t| t.is_blocked_on(sem.id()))
                .count() as i32;
            check_invariants(&k);
            if sem.value() != initial + signals - waits || blocked != (-sem.value()).max(0) {
                return false;
            }
        }
        true
    }
}
