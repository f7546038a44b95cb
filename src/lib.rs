//! # Invos: Invaders Operating System
//!
//! A small real-time kernel for the silly-invaders arcade firmware on ARM
//! Cortex-M4F (TM4C123) microcontrollers.
//!
//! ## Overview
//!
//! The kernel provides threads, a counting semaphore and tick-driven sleep.
//! Scheduling is hybrid priority-preemptive:
//!
//! - **Strict priority** between levels at every scheduling decision
//! - **Round-robin** among equal priorities, in registration order
//! - **Preemption** only at tick boundaries (slice expiry, or a woken thread
//!   outranking the running one); everything else is voluntary through
//!   `yield_now`, `sleep` and `wait`
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │          Application threads (game, drivers)            │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   thread_add() · run() · yield_now() · sleep()          │
//! │   semaphore_init() · signal() · wait()                  │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Tick subsystem   │  Semaphore        │
//! │  scheduler.rs│   timer.rs         │  semaphore.rs     │
//! │  ─ schedule()│   ─ tick()         │  ─ signal()       │
//! │  ─ yield()   │   ─ timer_tick()   │  ─ wait()         │
//! │  ─ sleep()   │                    │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │        Thread model (thread.rs) · sync.rs               │
//! │        TCB · ThreadState · critical sections            │
//! ├────────────────────────────────────────────────────────┤
//! │    Port trait (port.rs) ─ Arch port (arch/cortex_m4.rs) │
//! │    PendSV · SysTick · stack init · interrupt control    │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4F Hardware (Thumb-2)               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: thread control blocks and stacks are caller-supplied
//!   `'static` memory, fixed for the lifetime of the program
//! - **Fixed registry**: at most `MAX_THREADS` threads, append-only
//! - **Critical sections**: every scheduler and semaphore mutation runs with
//!   interrupts disabled; that is the whole locking discipline
//!
//! ## Undefined territory
//!
//! Threads never exit. Calling `wait`/`sleep` before `run()` logs an error
//! and does not block. Stack overflow is caught by a canary check when the
//! thread is switched out, and halts the system.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod error;
pub mod port;
pub mod scheduler;
pub mod semaphore;
pub mod sync;
pub mod thread;
pub mod timer;

#[cfg(target_os = "none")]
pub mod kernel;

#[cfg(all(target_os = "none", feature = "semihosting"))]
pub mod logger;

#[cfg(test)]
mod testing;

pub use error::SysError;
pub use scheduler::Scheduler;
pub use semaphore::Semaphore;
pub use thread::{Thread, ThreadEntry, ThreadId, ThreadState};
