//! Timestamped progress/diagnostic logging.
//!
//! Migrated from buildindex.c's `log_format`/`log_error`/`log_info`/
//! `log_debug`: every line is prefixed with `seconds.microseconds [tag] `.
//! `error` and `info` are unconditional; `debug` is gated behind the `-d`
//! flag. This crate hand-rolls the same small macro family rather than
//! depending on a general-purpose structured-logging crate, the way the
//! teacher repository hand-rolls its own `displaylevel!`/`display!` macros
//! instead of using `log`/`tracing`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Returns whether `-d` (verbose/debug logging) is currently enabled.
#[inline]
pub fn debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Enables or disables debug-level log lines.
#[inline]
pub fn set_debug_enabled(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Formats the `seconds.microseconds [tag] ` prefix used by every log line.
pub fn prefix(tag: &str) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:06} [{}] ", now.as_secs(), now.subsec_micros(), tag)
}

/// Unconditional error line to stderr. Equivalent to `log_error(...)`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprint!("{}", $crate::util::logging::prefix("error"));
        eprintln!($($arg)*);
    };
}

/// Unconditional info line to stderr. Equivalent to `log_info(...)`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        eprint!("{}", $crate::util::logging::prefix("info"));
        eprintln!($($arg)*);
    };
}

/// Info line gated behind [`debug_enabled`]. Equivalent to `log_debug(...)`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::util::logging::debug_enabled() {
            eprint!("{}", $crate::util::logging::prefix("debug"));
            eprintln!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_contains_tag() {
        let p = prefix("info");
        assert!(p.contains("[info]"));
        assert!(p.contains('.'));
    }

    #[test]
    fn debug_toggle_round_trips() {
        let prev = debug_enabled();
        set_debug_enabled(true);
        assert!(debug_enabled());
        set_debug_enabled(false);
        assert!(!debug_enabled());
        set_debug_enabled(prev);
    }

    #[test]
    fn macros_compile_and_run() {
        set_debug_enabled(true);
        log_info!("test info {}", 1);
        log_error!("test error {}", 2);
        log_debug!("test debug {}", 3);
        set_debug_enabled(false);
    }
}
