//! # Scheduler
//!
//! Thread registry and scheduling core. Implements hybrid priority-preemptive
//! scheduling: strict priority between levels, round-robin within a level,
//! preemption at tick boundaries.
//!
//! ## Scheduling Algorithm
//!
//! `schedule()` runs from the tick handler, from `yield_now`, and from the
//! tail of `wait`/`sleep`:
//! 1. **Demote**: the running thread (if still running) becomes Ready
//! 2. **Select**: scan the registry starting just after the last thread that
//!    ran and keep the first Ready thread of the highest priority seen
//! 3. **Idle**: if nothing is Ready, switch to the idle context, which sleeps
//!    in `wait_for_interrupt` until a tick or an interrupt readies a thread
//! 4. **Switch**: if the selection changed, ask the port for a context switch
//!
//! Starting the scan after the previous thread is what makes equal
//! priorities take turns. A higher-priority thread that never blocks or
//! sleeps starves everything below it; that is accepted behaviour.

use arrayvec::ArrayVec;

use crate::config::{MAX_THREADS, MIN_STACK_WORDS};
use crate::error::SysError;
use crate::port::{self, Port};
use crate::sync;
use crate::thread::{thread_trampoline, SemaphoreId, Thread, ThreadEntry, ThreadId, ThreadState};
use crate::timer;

/// What the CPU is (or is about to be) executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// The kernel-owned idle loop.
    Idle,
    /// A registered thread.
    Thread(ThreadId),
}

/// The scheduler context: registry, current selection, and tick state.
///
/// One instance lives for the whole program (see `kernel.rs`); host tests
/// create as many independent ones as they like.
///
/// ## Design Notes
///
/// - The registry is append-only and stops accepting threads once `run()`
///   has been called. Registration index is the circular scheduling order.
/// - `current` is the scheduler's decision; `active` is the context whose
///   registers are live on the CPU. They differ only between a switch
///   request and the port servicing it.
pub struct Scheduler<P: Port> {
    pub(crate) port: P,
    pub(crate) threads: ArrayVec<&'static mut Thread, MAX_THREADS>,
    idle: Thread,
    pub(crate) current: Context,
    /// Registry index the next selection scan starts after.
    rotation: usize,
    active: Option<Context>,
    pub(crate) started: bool,
    pub(crate) time_slice_us: u32,
    pub(crate) slice_start_us: u64,
    pub(crate) now_us: u64,
    pub(crate) ticks: u64,
}

impl<P: Port> Scheduler<P> {
    /// Create an empty scheduler around `port`.
    pub const fn new(port: P) -> Self {
        Self {
            port,
            threads: ArrayVec::new_const(),
            idle: Thread::new(),
            current: Context::Idle,
            rotation: 0,
            active: None,
            started: false,
            time_slice_us: 0,
            slice_start_us: 0,
            now_us: 0,
            ticks: 0,
        }
    }

    /// Register a thread. Must be called before [`Scheduler::run`].
    ///
    /// The thread enters the registry in Ready state at the next
    /// registration index. `priority` is numerically higher for more urgent
    /// threads; ties are served round-robin in registration order.
    ///
    /// # Returns
    /// - `Ok(id)`: the thread's registration index
    /// - `Err(SysError::AlreadyRunning)`: the kernel has been started
    /// - `Err(SysError::StackTooSmall)`: fewer than `MIN_STACK_WORDS` words
    /// - `Err(SysError::TooManyThreads)`: the registry is full
    pub fn thread_add(
        &mut self,
        thread: &'static mut Thread,
        entry: ThreadEntry,
        stack: &'static mut [u32],
        priority: u8,
    ) -> Result<ThreadId, SysError> {
        sync::critical_section(|_cs| {
            if self.started {
                return Err(SysError::AlreadyRunning);
            }
            if stack.len() < MIN_STACK_WORDS {
                return Err(SysError::StackTooSmall);
            }
            if self.threads.is_full() {
                return Err(SysError::TooManyThreads);
            }

            thread.entry = Some(entry);
            thread.priority = priority;
            thread.state = ThreadState::Ready;
            thread.attach_stack(stack);
            let arg = &*thread as *const Thread as usize;
            thread.stack_pointer = self.port.stack_init(thread_trampoline, arg, stack);

            let id = ThreadId(self.threads.len());
            self.threads.push(thread);
            log::info!("registered thread {} (priority {})", id.0, priority);
            Ok(id)
        })
    }

    /// Start the kernel.
    ///
    /// [`Scheduler::start`] followed by enabling interrupts. The port
    /// performs the actual switch as soon as interrupts are enabled, so on
    /// hardware control never comes back to the caller.
    pub fn run(&mut self, time_slice_us: u32) -> Result<(), SysError> {
        self.start(time_slice_us)?;
        P::enable_interrupts();
        Ok(())
    }

    /// Everything [`Scheduler::run`] does except unmasking interrupts.
    ///
    /// Configures the tick timer, builds the idle context, selects the
    /// highest-priority thread (lowest registration index on ties), pends
    /// the first switch and starts the timer. The interrupt mask is left as
    /// the caller had it, so a caller that entered with interrupts masked can
    /// drop its borrow of the scheduler before the first switch fires.
    pub fn start(&mut self, time_slice_us: u32) -> Result<(), SysError> {
        sync::critical_section(|_cs| {
            if self.started {
                return Err(SysError::AlreadyRunning);
            }
            if time_slice_us == 0 {
                return Err(SysError::InvalidArgument);
            }
            if self.threads.is_empty() {
                return Err(SysError::NoThreads);
            }

            self.tick_init(time_slice_us);

            let stack = self.port.idle_stack();
            self.idle.attach_stack(stack);
            self.idle.stack_pointer = self.port.stack_init(port::idle_loop::<P>, 0, stack);

            log::info!(
                "starting kernel: {} threads, {}us time slice",
                self.threads.len(),
                time_slice_us
            );

            // The first scan starts at index 0
            self.rotation = self.threads.len() - 1;
            self.started = true;
            self.current = Context::Idle;
            self.schedule();
            self.port.start();
            Ok(())
        })
    }

    /// Select the next context and request a switch if it changed.
    ///
    /// Architecture-layer API: applications use `yield_now`, `sleep` and
    /// `wait` instead.
    pub fn schedule(&mut self) {
        sync::critical_section(|_cs| {
            let prev = self.current;
            if let Context::Thread(id) = prev {
                let thread = &mut self.threads[id.0];
                if thread.state == ThreadState::Running {
                    thread.state = ThreadState::Ready;
                }
            }

            let next = match self.select(Thread::is_ready) {
                Some(index) => {
                    self.threads[index].state = ThreadState::Running;
                    self.rotation = index;
                    Context::Thread(ThreadId(index))
                }
                None => Context::Idle,
            };

            self.current = next;
            self.slice_start_us = self.now_us;

            if next != prev {
                log::trace!("switch {:?} -> {:?}", prev, next);
                self.port.request_switch();
            }
        })
    }

    /// Give up the rest of the time slice.
    ///
    /// The caller becomes Ready and the scheduler runs immediately; among
    /// equal priorities every other Ready thread gets a turn first.
    pub fn yield_now(&mut self) {
        sync::critical_section(|_cs| {
            if self.started {
                self.schedule();
            }
        })
    }

    /// Put the calling thread to sleep for at least `duration_ms`.
    ///
    /// The thread becomes Ready within one tick after the duration expires.
    /// `sleep(0)` is a yield.
    pub fn sleep(&mut self, duration_ms: u32) {
        if duration_ms == 0 {
            self.yield_now();
            return;
        }

        let ticks = timer::sleep_ticks(duration_ms);
        sync::critical_section(|_cs| match self.current {
            Context::Thread(id) if self.started => {
                self.threads[id.0].state = ThreadState::Sleeping { ticks };
                self.schedule();
            }
            _ => log::error!("sleep() called outside a running thread"),
        })
    }

    /// Mark the running thread Blocked on `sem` and schedule away from it.
    /// Returns `false` if there is no running thread to block.
    pub(crate) fn block_current(&mut self, sem: SemaphoreId) -> bool {
        match self.current {
            Context::Thread(id) if self.started => {
                self.threads[id.0].state = ThreadState::Blocked { on: sem };
                self.schedule();
                true
            }
            _ => false,
        }
    }

    /// Context-switch bookkeeping, called by the port's switch handler with
    /// interrupts disabled.
    ///
    /// Stores `saved_sp` in the outgoing context, verifies its stack canary,
    /// and returns the stack pointer of the selected context.
    ///
    /// # Panics
    /// If the outgoing context overflowed its stack.
    pub fn switch_context(&mut self, saved_sp: *mut u32) -> *mut u32 {
        if let Some(prev) = self.active {
            let outgoing = self.context_mut(prev);
            outgoing.stack_pointer = saved_sp;
            if !outgoing.stack_intact() {
                log::error!("stack overflow in {:?}", prev);
                panic!("stack overflow in {:?}", prev);
            }
        }

        let next = self.current;
        self.active = Some(next);
        self.context_mut(next).stack_pointer
    }

    fn context_mut(&mut self, ctx: Context) -> &mut Thread {
        match ctx {
            Context::Idle => &mut self.idle,
            Context::Thread(id) => &mut *self.threads[id.0],
        }
    }

    /// Scan the registry in rotated order (starting just after `rotation`)
    /// and return the first eligible thread of the highest priority.
    pub(crate) fn select(&self, eligible: impl Fn(&Thread) -> bool) -> Option<usize> {
        let count = self.threads.len();
        let mut best: Option<usize> = None;

        for step in 1..=count {
            let index = (self.rotation + step) % count;
            let thread: &Thread = &self.threads[index];
            if !eligible(thread) {
                continue;
            }
            match best {
                Some(b) if self.threads[b].priority >= thread.priority => {}
                _ => best = Some(index),
            }
        }

        best
    }

    /// Whether the thread at `index` should take the CPU from the current
    /// context right away.
    pub(crate) fn outranks_current(&self, index: usize) -> bool {
        match self.current {
            Context::Idle => true,
            Context::Thread(id) => self.threads[index].priority > self.threads[id.0].priority,
        }
    }

    /// Id of the running thread, or `None` while idle or before `run()`.
    pub fn current(&self) -> Option<ThreadId> {
        match self.current {
            Context::Thread(id) if self.started => Some(id),
            _ => None,
        }
    }

    /// State of a registered thread.
    ///
    /// # Panics
    /// If `id` was not issued by this scheduler.
    pub fn state(&self, id: ThreadId) -> ThreadState {
        self.threads[id.0].state
    }

    /// Priority of a registered thread.
    ///
    /// # Panics
    /// If `id` was not issued by this scheduler.
    pub fn priority(&self, id: ThreadId) -> u8 {
        self.threads[id.0].priority
    }

    /// Number of registered threads.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Ticks elapsed since `run()`.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether `run()` has been called successfully.
    pub fn is_running(&self) -> bool {
        self.started
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
