//! # Invos Firmware
//!
//! Boots the kernel with the thread layout of the arcade game:
//!
//! | Thread | Priority | Behavior |
//! |--------|----------|----------|
//! | `input_thread` | 3 | Samples the controls every 20 ms, signals `INPUT_READY` |
//! | `game_thread` | 2 | Waits for input, advances the game state, signals `FRAME_READY` |
//! | `render_thread` | 1 | Waits for a frame, pushes it to the display, yields |
//! | `heartbeat_thread` | 1 | Logs the frame count once a second |
//!
//! Input sampling preempts everything else when its sleep expires; render
//! and heartbeat share the lowest level round-robin.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware {
    use core::ptr::addr_of_mut;
    use core::sync::atomic::{AtomicU32, Ordering};

    use cortex_m_rt::entry;
    use panic_halt as _;

    use invos::config::DEFAULT_TIME_SLICE_US;
    use invos::{kernel, Semaphore, Thread, ThreadEntry};

    const STACK_WORDS: usize = 256;

    static INPUT_READY: Semaphore = Semaphore::new(0);
    static FRAME_READY: Semaphore = Semaphore::new(0);

    static SLIDER: AtomicU32 = AtomicU32::new(0);
    static DEFENDER_X: AtomicU32 = AtomicU32::new(0);
    static FRAMES: AtomicU32 = AtomicU32::new(0);

    static mut INPUT_TCB: Thread = Thread::new();
    static mut GAME_TCB: Thread = Thread::new();
    static mut RENDER_TCB: Thread = Thread::new();
    static mut HEARTBEAT_TCB: Thread = Thread::new();

    static mut INPUT_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];
    static mut GAME_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];
    static mut RENDER_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];
    static mut HEARTBEAT_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];

    // -----------------------------------------------------------------------
    // Thread entry points
    // -----------------------------------------------------------------------

    fn input_thread() -> ! {
        loop {
            kernel::sleep(20);
            // Stand-in for the ADC slider reading
            SLIDER.fetch_add(37, Ordering::Relaxed);
            kernel::signal(&INPUT_READY);
        }
    }

    fn game_thread() -> ! {
        loop {
            kernel::wait(&INPUT_READY);
            // Map the 12-bit slider onto the 84-pixel display, minus the
            // defender's width
            let x = (SLIDER.load(Ordering::Relaxed) % 4096) * 76 / 4095;
            DEFENDER_X.store(x, Ordering::Relaxed);
            kernel::signal(&FRAME_READY);
        }
    }

    fn render_thread() -> ! {
        loop {
            kernel::wait(&FRAME_READY);
            // Stand-in for pushing the frame buffer over SPI
            let mut work: u32 = 0;
            for _ in 0..2000 {
                work = work.wrapping_add(1);
            }
            FRAMES.fetch_add(1, Ordering::Relaxed);
            kernel::yield_now();
        }
    }

    fn heartbeat_thread() -> ! {
        loop {
            kernel::sleep(1000);
            log::info!("frames rendered: {}", FRAMES.load(Ordering::Relaxed));
        }
    }

    // -----------------------------------------------------------------------
    // Main entry point
    // -----------------------------------------------------------------------

    fn spawn(
        tcb: *mut Thread,
        stack: *mut [u32; STACK_WORDS],
        entry: ThreadEntry,
        priority: u8,
    ) {
        // Safety: each TCB/stack pair is a distinct static handed out once
        let (tcb, stack) = unsafe { (&mut *tcb, &mut *stack) };
        kernel::thread_add(tcb, entry, stack, priority).expect("Failed to register thread");
    }

    /// Firmware entry point. Registers the threads and starts the kernel.
    /// Does not return.
    #[entry]
    fn main() -> ! {
        let mut cp = cortex_m::Peripherals::take().unwrap();

        #[cfg(feature = "semihosting")]
        invos::logger::init(log::LevelFilter::Info);

        kernel::init(cp.SYST, &mut cp.SCB);

        spawn(addr_of_mut!(INPUT_TCB), addr_of_mut!(INPUT_STACK), input_thread, 3);
        spawn(addr_of_mut!(GAME_TCB), addr_of_mut!(GAME_STACK), game_thread, 2);
        spawn(addr_of_mut!(RENDER_TCB), addr_of_mut!(RENDER_STACK), render_thread, 1);
        spawn(
            addr_of_mut!(HEARTBEAT_TCB),
            addr_of_mut!(HEARTBEAT_STACK),
            heartbeat_thread,
            1,
        );

        match kernel::run(DEFAULT_TIME_SLICE_US) {
            Ok(never) => match never {},
            Err(err) => panic!("kernel failed to start: {err}"),
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("invos is firmware; build it with --target thumbv7em-none-eabihf");
}
