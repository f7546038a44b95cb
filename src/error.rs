//! # Status Codes
//!
//! Setup-time failures of the kernel API. These are the only recoverable
//! errors: once `run()` has switched into the first thread there is no
//! runtime error channel.

use core::fmt;

const EINVAL: i32 = 22;
const ENOMEM: i32 = 12;
const ESRCH: i32 = 3;

/// Configuration error returned by `thread_add` and `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    /// An argument is out of range (e.g. a zero time slice).
    InvalidArgument,
    /// The supplied stack cannot hold the initial context frame.
    StackTooSmall,
    /// The registry already holds `MAX_THREADS` threads.
    TooManyThreads,
    /// The kernel is already running; threads can't be added at runtime.
    AlreadyRunning,
    /// `run()` was called with an empty registry.
    NoThreads,
}

impl SysError {
    /// Negative errno-style status code for C-style callers.
    pub const fn code(self) -> i32 {
        match self {
            SysError::InvalidArgument | SysError::StackTooSmall | SysError::AlreadyRunning => -EINVAL,
            SysError::TooManyThreads => -ENOMEM,
            SysError::NoThreads => -ESRCH,
        }
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SysError::InvalidArgument => "invalid argument",
            SysError::StackTooSmall => "stack too small for the initial frame",
            SysError::TooManyThreads => "thread registry is full",
            SysError::AlreadyRunning => "kernel is already running",
            SysError::NoThreads => "no threads registered",
        };
        f.write_str(msg)
    }
}
