//! `log` backend writing to the debugger's console through ARM semihosting.
//!
//! Semihosting halts the core for every write, so keep the max level low in
//! timing-sensitive builds.

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        cortex_m_semihosting::heprintln!(
            "[{level:5} {target}] {args}",
            level = record.level(),
            target = record.target(),
            args = record.args()
        );
    }

    fn flush(&self) {}
}

/// Install the semihosting logger with the given level filter.
pub fn init(level: log::LevelFilter) {
    // Safety: called once from `main` before any thread exists.
    if unsafe { log::set_logger_racy(&Logger) }.is_ok() {
        log::set_max_level(level);
    }
}
