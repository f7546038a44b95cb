//! # Kernel
//!
//! The firmware's single scheduler instance and the API drivers and game
//! code call. Every function reaches the scheduler inside a critical
//! section; the scheduler itself never allocates.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← Hand SysTick to the port
//!         ├─► kernel::thread_add()  ← Register threads (×N)
//!         └─► kernel::run()         ← Start scheduling (no return)
//!               ├─► Mask interrupts
//!               ├─► Configure SysTick
//!               ├─► Build the idle context
//!               ├─► Select the first thread, pend PendSV
//!               └─► Enable interrupts → PendSV switches into the thread
//! ```

use core::convert::Infallible;
use core::ptr::addr_of_mut;

use cortex_m::peripheral::{SCB, SYST};

use crate::arch::cortex_m4::CortexM4;
use crate::error::SysError;
use crate::port::Port;
use crate::scheduler::Scheduler;
use crate::semaphore::Semaphore;
use crate::sync;
use crate::thread::{Thread, ThreadEntry, ThreadId};

/// Global scheduler instance. Created at boot, lives for the whole run.
///
/// # Safety
/// Accessed only through [`scheduler`], from critical sections or from the
/// PendSV/SysTick handlers (which never nest).
static mut SCHEDULER: Scheduler<CortexM4> = Scheduler::new(CortexM4::new());

/// Raw access to the global scheduler for the port's exception handlers.
///
/// # Safety
/// The caller must have interrupts disabled and must not hold another
/// reference obtained from this function.
pub(crate) unsafe fn scheduler() -> &'static mut Scheduler<CortexM4> {
    &mut *addr_of_mut!(SCHEDULER)
}

fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler<CortexM4>) -> R) -> R {
    // Safety: exclusive for the duration of the critical section
    sync::critical_section(|_cs| f(unsafe { scheduler() }))
}

/// Initialize the kernel. Must be called once, before any other kernel
/// function.
pub fn init(syst: SYST, scb: &mut SCB) {
    with_scheduler(|s| s.port.attach(syst, scb));
}

/// Register a thread. See [`Scheduler::thread_add`].
///
/// # Example
/// ```ignore
/// static mut TCB: Thread = Thread::new();
/// static mut STACK: [u32; 256] = [0; 256];
///
/// let id = kernel::thread_add(
///     unsafe { &mut *addr_of_mut!(TCB) },
///     my_thread,
///     unsafe { &mut *addr_of_mut!(STACK) },
///     2,
/// )?;
/// ```
pub fn thread_add(
    thread: &'static mut Thread,
    entry: ThreadEntry,
    stack: &'static mut [u32],
    priority: u8,
) -> Result<ThreadId, SysError> {
    with_scheduler(|s| s.thread_add(thread, entry, stack, priority))
}

/// Start the kernel with a `time_slice_us` preemption budget. **Does not
/// return** unless the configuration is rejected.
pub fn run(time_slice_us: u32) -> Result<Infallible, SysError> {
    // PendSV and SysTick reach the scheduler through `scheduler()`, so no
    // borrow of it may be live once they can fire. The critical section
    // restores the mask set here, and only the unmask below lets the first
    // switch happen; the boot context is abandoned.
    CortexM4::disable_interrupts();
    let started = with_scheduler(|s| s.start(time_slice_us));
    CortexM4::enable_interrupts();
    started?;
    loop {
        CortexM4::wait_for_interrupt();
    }
}

/// Give up the rest of the caller's time slice.
pub fn yield_now() {
    with_scheduler(|s| s.yield_now());
}

/// Suspend the caller for at least `duration_ms`.
pub fn sleep(duration_ms: u32) {
    with_scheduler(|s| s.sleep(duration_ms));
}

/// Reset a semaphore's counter.
pub fn semaphore_init(sem: &Semaphore, initial_value: i32) {
    sem.init(initial_value);
}

/// Increment `sem`, waking one waiter. Safe to call from interrupt handlers.
pub fn signal(sem: &Semaphore) {
    with_scheduler(|s| s.signal(sem));
}

/// Decrement `sem`, blocking the caller until it can be acquired.
pub fn wait(sem: &Semaphore) {
    with_scheduler(|s| s.wait(sem));
}

/// Id of the calling thread.
pub fn current() -> Option<ThreadId> {
    with_scheduler(|s| s.current())
}

/// Unmask interrupts (drivers ending a hand-rolled critical section).
pub fn enable_interrupts() {
    CortexM4::enable_interrupts();
}

/// Mask interrupts.
pub fn disable_interrupts() {
    CortexM4::disable_interrupts();
}

/// Sleep the core until the next interrupt.
pub fn wait_for_interrupt() {
    CortexM4::wait_for_interrupt();
}

pub(crate) fn tick() {
    with_scheduler(|s| s.tick());
}
