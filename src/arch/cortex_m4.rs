//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4F (TM4C123). Implements
//! context switching via PendSV, the SysTick tick, and interrupt control.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): boot code and interrupt handlers
//! - **PSP** (Process Stack Pointer): threads and the idle context
//!
//! On exception entry the hardware stacks R0–R3, R12, LR, PC and xPSR (plus
//! S0–S15/FPSCR when the thread used the FPU). PendSV saves the rest: R4–R11,
//! the EXC_RETURN value, and S16–S31 if the FPU frame is live. The saved
//! EXC_RETURN tells the restore path which frame format to expect.
//!
//! ## Interrupt Priorities
//!
//! SysTick and PendSV both run at the lowest priority, so neither preempts
//! driver interrupts and a tick never nests inside another tick.

use core::arch::global_asm;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use super::frame;
use crate::config::{IDLE_STACK_WORDS, SYSTEM_CLOCK_HZ};
use crate::port::{ContextEntry, Port};

/// Stack of the kernel-owned idle context.
static mut IDLE_STACK: [u32; IDLE_STACK_WORDS] = [0; IDLE_STACK_WORDS];

/// PSP target for the very first PendSV, whose saved registers are
/// discarded.
static mut BOOT_SCRATCH: [u32; 32] = [0; 32];

/// The Cortex-M4 port. Owns SysTick once `kernel::init` hands it over.
pub struct CortexM4 {
    syst: Option<SYST>,
}

impl CortexM4 {
    pub const fn new() -> Self {
        Self { syst: None }
    }

    /// Take ownership of SysTick and drop PendSV/SysTick to the lowest
    /// priority.
    pub fn attach(&mut self, syst: SYST, scb: &mut SCB) {
        self.syst = Some(syst);
        // Safety: the kernel does not use priority-based critical sections
        unsafe {
            scb.set_priority(SystemHandler::PendSV, 0xFF);
            scb.set_priority(SystemHandler::SysTick, 0xFF);
        }
    }
}

impl Port for CortexM4 {
    fn stack_init(&mut self, func: ContextEntry, arg: usize, stack: &mut [u32]) -> *mut u32 {
        frame::initial_frame(
            stack,
            func as usize as u32,
            arg as u32,
            thread_exit as usize as u32,
        )
    }

    fn idle_stack(&mut self) -> &'static mut [u32] {
        // Safety: handed out once, from `Scheduler::run`
        unsafe { &mut *core::ptr::addr_of_mut!(IDLE_STACK) }
    }

    fn tick_init(&mut self, period_us: u32) {
        let reload = SYSTEM_CLOCK_HZ / 1_000_000 * period_us - 1;
        match self.syst.as_mut() {
            Some(syst) => {
                syst.set_reload(reload);
                syst.clear_current();
                syst.set_clock_source(SystClkSource::Core);
            }
            None => log::error!("SysTick not attached; call kernel::init first"),
        }
    }

    fn start(&mut self) {
        // The first PendSV stacks the boot context's registers somewhere
        // harmless before the first thread's frame is restored.
        unsafe {
            let scratch = core::ptr::addr_of_mut!(BOOT_SCRATCH) as *mut u32;
            cortex_m::register::psp::write(scratch.add(32) as u32);
        }
        if let Some(syst) = self.syst.as_mut() {
            syst.enable_counter();
            syst.enable_interrupt();
        }
    }

    #[inline]
    fn request_switch(&mut self) {
        SCB::set_pendsv();
    }

    #[inline]
    fn enable_interrupts() {
        // Safety: not used inside a `critical_section` closure by the kernel
        unsafe { cortex_m::interrupt::enable() }
    }

    #[inline]
    fn disable_interrupts() {
        cortex_m::interrupt::disable();
    }

    #[inline]
    fn wait_for_interrupt() {
        cortex_m::asm::wfi();
    }
}

/// Return address of every initial frame. Thread entries are `fn() -> !`, so
/// reaching this means the stack was corrupted: trap and halt.
extern "C" fn thread_exit() -> ! {
    log::error!("thread returned from its entry function");
    panic!("thread returned");
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

// Sequence:
// 1. Push S16–S31 (if the FPU frame is live), R4–R11 and EXC_RETURN on PSP
// 2. Hand the resulting PSP to `Scheduler::switch_context`
// 3. Pop the same set from the stack pointer it returns
// 4. Exception return through the restored EXC_RETURN
global_asm!(
    ".section .text.PendSV,\"ax\",%progbits",
    ".global PendSV",
    ".type PendSV,%function",
    ".thumb_func",
    ".fpu fpv4-sp-d16",
    "PendSV:",
    "    cpsid i",
    "    mrs r0, psp",
    "    tst lr, #0x10",
    "    it eq",
    "    vstmdbeq r0!, {{s16-s31}}",
    "    stmdb r0!, {{r4-r11, lr}}",
    "    bl {switch}",
    "    ldmia r0!, {{r4-r11, lr}}",
    "    tst lr, #0x10",
    "    it eq",
    "    vldmiaeq r0!, {{s16-s31}}",
    "    msr psp, r0",
    "    cpsie i",
    "    bx lr",
    switch = sym pendsv_switch,
);

/// Called from PendSV with interrupts disabled.
extern "C" fn pendsv_switch(saved_sp: *mut u32) -> *mut u32 {
    // Safety: interrupts are disabled for the duration of the handler
    unsafe { crate::kernel::scheduler() }.switch_context(saved_sp)
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// Scheduler tick entry point. Pends PendSV when the tick preempts.
#[cortex_m_rt::exception]
fn SysTick() {
    crate::kernel::tick();
}
