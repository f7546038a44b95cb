//! # Thread Control Block
//!
//! Defines the per-thread record the scheduler works on. TCBs are supplied
//! by the caller (usually as `static`s) and registered once with
//! `thread_add`; the kernel never allocates or frees them.
//!
//! Scheduling state is a tagged enum rather than a flag word, so a thread
//! can't be sleeping and blocked at the same time: the sleep countdown only
//! exists in `Sleeping` and the blocking semaphore only in `Blocked`.

use crate::config::STACK_CANARY;

/// Thread entry point. Threads run forever; there is no exit operation.
pub type ThreadEntry = fn() -> !;

/// Index of a thread in the registry, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub(crate) usize);

impl ThreadId {
    /// Registration index (0 for the first registered thread).
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identity of a semaphore, taken from its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreId(pub(crate) usize);

/// Execution state of a thread.
///
/// ```text
///   ┌──────────┐     schedule()      ┌─────────┐
///   │  Ready   │ ──────────────────► │ Running │
///   └──────────┘ ◄────────────────── └─────────┘
///     ▲     ▲    tick expiry / yield   │     │
///     │     │                  wait()  │     │ sleep()
///     │     │   signal()   ┌─────────┐ │     │
///     │     └───────────── │ Blocked │◄┘     │
///     │                    └─────────┘       ▼
///     │        countdown reaches 0     ┌──────────┐
///     └─────────────────────────────── │ Sleeping │
///                                      └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Runnable, waiting for the CPU.
    Ready,
    /// Currently executing. At most one thread is in this state.
    Running,
    /// Waiting on a semaphore until a matching `signal`.
    Blocked {
        /// The semaphore being waited on.
        on: SemaphoreId,
    },
    /// Waiting for a tick countdown to expire.
    Sleeping {
        /// Remaining ticks; always non-zero while sleeping.
        ticks: u32,
    },
}

/// Thread Control Block.
///
/// `stack_pointer` is written only by the context-switch bookkeeping and read
/// only while the thread is switched out. `stack_bottom` points at the canary
/// word at the lowest address of the thread's stack.
pub struct Thread {
    pub(crate) stack_pointer: *mut u32,
    pub(crate) stack_bottom: *const u32,
    pub(crate) state: ThreadState,
    pub(crate) entry: Option<ThreadEntry>,
    pub(crate) priority: u8,
}

// Safety: the raw pointers always point into the thread's own stack, which
// lives for `'static`. TCBs are only touched inside critical sections.
unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

impl Thread {
    /// Create an unregistered TCB, suitable for a `static`.
    pub const fn new() -> Self {
        Self {
            stack_pointer: core::ptr::null_mut(),
            stack_bottom: core::ptr::null(),
            state: ThreadState::Ready,
            entry: None,
            priority: 0,
        }
    }

    /// Current scheduling state.
    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Static priority; numerically higher runs first.
    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Saved stack pointer (meaningful only while switched out).
    #[inline]
    pub fn stack_pointer(&self) -> *mut u32 {
        self.stack_pointer
    }

    #[inline]
    pub(crate) fn is_ready(&self) -> bool {
        self.state == ThreadState::Ready
    }

    #[inline]
    pub(crate) fn is_blocked_on(&self, sem: SemaphoreId) -> bool {
        self.state == ThreadState::Blocked { on: sem }
    }

    /// Bind the TCB to its stack and plant the canary.
    pub(crate) fn attach_stack(&mut self, stack: &mut [u32]) {
        stack[0] = STACK_CANARY;
        self.stack_bottom = stack.as_ptr();
    }

    /// Returns `false` once the canary at the bottom of the stack has been
    /// overwritten.
    pub fn stack_intact(&self) -> bool {
        if self.stack_bottom.is_null() {
            return true;
        }
        // Safety: `stack_bottom` points at word 0 of a `'static` stack.
        unsafe { core::ptr::read_volatile(self.stack_bottom) == STACK_CANARY }
    }

    /// Advance the sleep countdown by one tick. Returns `true` if the thread
    /// just woke up.
    pub(crate) fn tick_sleep(&mut self) -> bool {
        if let ThreadState::Sleeping { ticks } = self.state {
            if ticks <= 1 {
                self.state = ThreadState::Ready;
                return true;
            }
            self.state = ThreadState::Sleeping { ticks: ticks - 1 };
        }
        false
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// First code run by every registered thread. `arg` is the address of the
/// thread's TCB.
pub(crate) extern "C" fn thread_trampoline(arg: usize) -> ! {
    // Safety: the scheduler passes the address of a registered `'static` TCB.
    let thread = unsafe { &*(arg as *const Thread) };
    match thread.entry {
        Some(entry) => entry(),
        None => loop {
            core::hint::spin_loop();
        },
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
