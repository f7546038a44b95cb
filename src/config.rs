//! # Invos Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time; the kernel never allocates.

/// Maximum number of threads the registry can hold. Thread control blocks
/// and stacks are caller-supplied, so this only bounds the registry table.
pub const MAX_THREADS: usize = 8;

/// Period of the hardware tick in microseconds. Sleep durations are
/// expressed in milliseconds, so this is the kernel's unit of time.
pub const TICK_PERIOD_US: u32 = 1000;

/// Smallest stack, in 32-bit words, accepted by `thread_add`. Must cover
/// the initial context frame (17 words), the canary word, and the first few
/// call frames of the thread function.
pub const MIN_STACK_WORDS: usize = 64;

/// Stack size of the kernel-owned idle context, in 32-bit words.
pub const IDLE_STACK_WORDS: usize = 64;

/// Written to the lowest word of every stack at registration and checked
/// whenever the owning context is switched out.
pub const STACK_CANARY: u32 = 0xC0DE_CAFE;

/// Time slice handed to `run()` by the firmware binary.
pub const DEFAULT_TIME_SLICE_US: u32 = 10_000;

/// System clock frequency in Hz (TM4C123 precision internal oscillator).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
