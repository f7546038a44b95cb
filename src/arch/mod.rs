//! # Architecture Abstraction Layer
//!
//! Implementations of [`crate::port::Port`]. The Cortex-M4 port is the only
//! hardware target; the mock port backs the host unit tests.

pub mod frame;

#[cfg(target_os = "none")]
pub mod cortex_m4;

#[cfg(test)]
pub mod mock;
