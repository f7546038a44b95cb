//! Shared fixtures for the host unit tests.

use crate::arch::mock::MockPort;
use crate::config::MIN_STACK_WORDS;
use crate::scheduler::Scheduler;
use crate::thread::{Thread, ThreadId, ThreadState};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn spin() -> ! {
    loop {
        std::hint::spin_loop();
    }
}

pub fn leak_thread() -> &'static mut Thread {
    Box::leak(Box::new(Thread::new()))
}

pub fn leak_stack(words: usize) -> &'static mut [u32] {
    Box::leak(vec![0u32; words].into_boxed_slice())
}

/// A scheduler with one thread per entry of `priorities`, not yet started.
pub fn registered(priorities: &[u8]) -> (Scheduler<MockPort>, Vec<ThreadId>) {
    init_logging();
    let mut k = Scheduler::new(MockPort::new());
    let ids = priorities
        .iter()
        .map(|&p| {
            k.thread_add(leak_thread(), spin, leak_stack(MIN_STACK_WORDS), p)
                .unwrap()
        })
        .collect();
    (k, ids)
}

/// Same as [`registered`], then started with `time_slice_us`.
pub fn running(priorities: &[u8], time_slice_us: u32) -> (Scheduler<MockPort>, Vec<ThreadId>) {
    let (mut k, ids) = registered(priorities);
    k.run(time_slice_us).unwrap();
    (k, ids)
}

/// Structural scheduler invariants that must hold after every operation.
pub fn check_invariants(k: &Scheduler<MockPort>) {
    let ids: Vec<ThreadId> = (0..k.thread_count()).map(ThreadId).collect();
    let running: Vec<ThreadId> = ids
        .iter()
        .copied()
        .filter(|&id| k.state(id) == ThreadState::Running)
        .collect();
    assert!(running.len() <= 1, "several threads running: {running:?}");

    let any_ready = ids.iter().any(|&id| k.state(id) == ThreadState::Ready);
    if any_ready {
        assert_eq!(running.len(), 1, "ready threads but none running");
    }

    match k.current() {
        Some(current) => {
            assert_eq!(running, vec![current]);
            for &id in &ids {
                if k.state(id) == ThreadState::Ready {
                    assert!(
                        k.priority(current) >= k.priority(id),
                        "{current:?} runs while higher priority {id:?} is ready"
                    );
                }
            }
        }
        None => assert!(running.is_empty()),
    }

    for &id in &ids {
        if let ThreadState::Sleeping { ticks } = k.state(id) {
            assert!(ticks > 0);
        }
    }
}
