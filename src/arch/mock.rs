//! Host port used by the unit tests. Switch requests and stack inits are
//! only recorded; the test drives "the running thread" by calling the
//! scheduler on its behalf.

use std::cell::{Cell, RefCell};
use std::sync::mpsc::Sender;

use super::frame;
use crate::config::IDLE_STACK_WORDS;
use crate::port::{ContextEntry, Port};

thread_local! {
    static INTERRUPTS_ENABLED: Cell<bool> = Cell::new(false);
    static WFI_COUNT: Cell<u32> = Cell::new(0);
    static PARK_AFTER_WFI: RefCell<Option<(u32, Sender<u32>)>> = RefCell::new(None);
}

#[derive(Debug, Default)]
pub struct MockPort {
    pub switch_requests: u32,
    pub stack_inits: Vec<usize>,
    pub tick_period_us: Option<u32>,
    pub started: bool,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.with(Cell::get)
    }

    pub fn wfi_count() -> u32 {
        WFI_COUNT.with(Cell::get)
    }

    /// Make the calling OS thread park for good on its `count`-th
    /// `wait_for_interrupt`, after sending its WFI count to `report`. Lets a
    /// test run a context body that never returns.
    pub fn park_after_wfi(count: u32, report: Sender<u32>) {
        PARK_AFTER_WFI.with(|p| *p.borrow_mut() = Some((count, report)));
    }
}

extern "C" fn mock_exit() -> ! {
    panic!("thread returned");
}

impl Port for MockPort {
    fn stack_init(&mut self, func: ContextEntry, arg: usize, stack: &mut [u32]) -> *mut u32 {
        self.stack_inits.push(arg);
        frame::initial_frame(
            stack,
            func as usize as u32,
            arg as u32,
            mock_exit as usize as u32,
        )
    }

    fn idle_stack(&mut self) -> &'static mut [u32] {
        Box::leak(vec![0u32; IDLE_STACK_WORDS].into_boxed_slice())
    }

    fn tick_init(&mut self, period_us: u32) {
        self.tick_period_us = Some(period_us);
    }

    fn start(&mut self) {
        self.started = true;
    }

    fn request_switch(&mut self) {
        self.switch_requests += 1;
    }

    fn enable_interrupts() {
        INTERRUPTS_ENABLED.with(|e| e.set(true));
    }

    fn disable_interrupts() {
        INTERRUPTS_ENABLED.with(|e| e.set(false));
    }

    fn wait_for_interrupt() {
        WFI_COUNT.with(|c| c.set(c.get() + 1));
        let count = Self::wfi_count();
        let report = PARK_AFTER_WFI.with(|p| {
            let mut park = p.borrow_mut();
            match park.take() {
                Some((limit, tx)) if limit == count => Some(tx),
                other => {
                    *park = other;
                    None
                }
            }
        });
        if let Some(tx) = report {
            let _ = tx.send(count);
            loop {
                std::thread::park();
            }
        }
    }
}
