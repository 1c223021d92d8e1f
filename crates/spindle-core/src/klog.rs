//! Leveled stderr logging
//!
//! Thread-safe, optionally-flushing diagnostics in the style of the kernel's
//! printk. The scheduling fast path never logs; these macros cover init,
//! teardown, worker lifecycle and abort diagnostics.
//!
//! # Environment variables
//!
//! - `SPINDLE_LOG_LEVEL=<off|error|warn|info|debug|trace>` (default: warn)
//! - `SPINDLE_FLUSH_LOG=1` - flush stderr after every record (crash debugging)

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[spindle:error]",
            LogLevel::Warn => "[spindle:warn ]",
            LogLevel::Info => "[spindle:info ]",
            LogLevel::Debug => "[spindle:debug]",
            LogLevel::Trace => "[spindle:trace]",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static FLUSH: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Read level and flush mode from the environment, once.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Ok(val) = std::env::var("SPINDLE_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => LogLevel::Warn,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
    if let Ok(val) = std::env::var("SPINDLE_FLUSH_LOG") {
        FLUSH.store(
            matches!(val.as_str(), "1" | "true" | "yes" | "on"),
            Ordering::Relaxed,
        );
    }
}

pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn _log_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "{} ", level.prefix());
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

#[macro_export]
macro_rules! serror {
    ($($arg:tt)*) => {{
        $crate::klog::_log_impl($crate::klog::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! swarn {
    ($($arg:tt)*) => {{
        $crate::klog::_log_impl($crate::klog::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! sinfo {
    ($($arg:tt)*) => {{
        $crate::klog::_log_impl($crate::klog::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! sdebug {
    ($($arg:tt)*) => {{
        $crate::klog::_log_impl($crate::klog::LogLevel::Debug, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! strace {
    ($($arg:tt)*) => {{
        $crate::klog::_log_impl($crate::klog::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn from_u8_saturates() {
        assert_eq!(LogLevel::from_u8(0), LogLevel::Off);
        assert_eq!(LogLevel::from_u8(3), LogLevel::Info);
        assert_eq!(LogLevel::from_u8(200), LogLevel::Trace);
    }

    #[test]
    fn macros_compile_and_gate() {
        set_log_level(LogLevel::Off);
        serror!("suppressed {}", 1);
        swarn!("suppressed");
        sinfo!("suppressed");
        sdebug!("suppressed");
        strace!("suppressed");
        assert!(!level_enabled(LogLevel::Error));
    }
}
