//! # Cortex-M Initial Context Frame
//!
//! Layout of a freshly initialised thread stack, as restored by the PendSV
//! handler on the first switch into the thread. Kept free of inline assembly
//! so it can be checked on the host.
//!
//! ## Stack Layout (top = high address, growing down)
//!
//! ```text
//! [Hardware stacked frame]   (popped by exception return)
//!   xPSR  (Thumb bit set)
//!   PC    (entry function, bit 0 clear)
//!   LR    (exit handler)
//!   R12   (0)
//!   R3    (0)
//!   R2    (0)
//!   R1    (0)
//!   R0    (argument)
//! [Software saved context]   (popped by PendSV)
//!   EXC_RETURN (thread mode, PSP, no FP context)
//!   R11 .. R4  (0)           <- initial stack pointer
//! ```

/// Words occupied by the initial frame.
pub const FRAME_WORDS: usize = 17;

/// Only the Thumb bit set.
pub const INITIAL_XPSR: u32 = 0x0100_0000;

/// Return to Thread mode, use PSP, no floating-point context stacked.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

const SOFTWARE_WORDS: usize = 9;

/// Write the initial frame at the 8-byte aligned top of `stack` and return
/// the resulting stack pointer.
///
/// `entry`, `arg` and `exit` are 32-bit target addresses/values.
///
/// # Panics
/// If `stack` can't hold [`FRAME_WORDS`] plus alignment padding. The
/// scheduler rejects such stacks before calling this.
pub fn initial_frame(stack: &mut [u32], entry: u32, arg: u32, exit: u32) -> *mut u32 {
    let top = stack.as_ptr() as usize + stack.len() * 4;
    // Align to 8 bytes (AAPCS requirement)
    let padding = (top & 0x07) / 4;
    let base = stack.len() - padding - FRAME_WORDS;

    let frame = &mut stack[base..base + FRAME_WORDS];
    // Software-saved registers (R4–R11) and EXC_RETURN
    frame[..8].fill(0);
    frame[8] = EXC_RETURN_THREAD_PSP;

    // Hardware-stacked frame (R0–R3, R12, LR, PC, xPSR)
    let hw = &mut frame[SOFTWARE_WORDS..];
    hw[0] = arg;
    hw[1..5].fill(0);
    hw[5] = exit;
    // Exception return wants a halfword-aligned PC; Thumb state comes from xPSR
    hw[6] = entry & !1;
    hw[7] = INITIAL_XPSR;

    frame.as_mut_ptr()
}
