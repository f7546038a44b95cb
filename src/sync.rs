//! # Synchronization Primitives
//!
//! The kernel's entire locking discipline: disable interrupts, mutate,
//! restore. Every access to the thread registry, the current-thread index,
//! or a semaphore counter happens inside [`critical_section`].
//!
//! On the target the implementation comes from `cortex-m`'s
//! `critical-section-single-core` feature (PRIMASK save/restore), so nested
//! sections are fine and the outermost one re-enables interrupts. Host tests
//! link the `critical-section` crate's `std` implementation instead.

pub use critical_section::CriticalSection;

/// Execute a closure with interrupts disabled.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|_cs| {
///     // Access shared state safely
/// });
/// ```
///
/// Keep critical sections short; the tick interrupt is held off for their
/// whole duration.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}
