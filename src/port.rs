//! # Port Interface
//!
//! The narrow boundary between the portable scheduler and the hardware. A
//! port implements this once per target; the scheduler logic (selection,
//! state transitions, semaphore math) depends on nothing else.
//!
//! ## Context-switch contract
//!
//! - [`Port::stack_init`] builds an initial stack image such that the first
//!   switch into it calls `func(arg)` with interrupts enabled. `func` never
//!   returns, so the return address may point at a halting handler.
//! - [`Port::request_switch`] asks for a switch to whatever the scheduler
//!   selected. The port's switch handler saves the full register file (and
//!   FP state when live) on the outgoing stack, hands the resulting stack
//!   pointer to `Scheduler::switch_context`, and restores from the pointer it
//!   gets back. The request may be serviced later (e.g. on interrupt exit),
//!   but before the requesting thread executes another instruction outside
//!   a critical section.

/// Entry point signature used by [`Port::stack_init`].
pub type ContextEntry = extern "C" fn(usize) -> !;

/// Architecture port used by the scheduler.
pub trait Port {
    /// Build the initial stack image for a new context and return the stack
    /// pointer to store in its TCB.
    fn stack_init(&mut self, func: ContextEntry, arg: usize, stack: &mut [u32]) -> *mut u32;

    /// Stack for the kernel-owned idle context, which runs
    /// [`Port::wait_for_interrupt`] in a loop when no thread is ready.
    fn idle_stack(&mut self) -> &'static mut [u32];

    /// Configure the periodic timer to fire every `period_us`. Does not start
    /// it.
    fn tick_init(&mut self, period_us: u32);

    /// Start the timer configured by [`Port::tick_init`] and prepare the CPU
    /// for the first context switch.
    fn start(&mut self);

    /// Request a context switch to the scheduler's current selection.
    fn request_switch(&mut self);

    /// Unmask interrupts.
    fn enable_interrupts();

    /// Mask interrupts.
    fn disable_interrupts();

    /// Enter low-power sleep until the next interrupt.
    fn wait_for_interrupt();
}

/// Body of the idle context.
pub(crate) extern "C" fn idle_loop<P: Port>(_arg: usize) -> ! {
    loop {
        P::wait_for_interrupt();
    }
}
