//! Small shared helpers used across the build, merge, and match pipelines.
//!
//! Submodules:
//! - [`logging`] — timestamped `log_info!`/`log_error!`/`log_debug!` macros and
//!   the `-d`-gated debug level, migrated from buildindex.c's `log_format`
//!   family.
//! - [`input`]   — input-file reading, including transparent gzip
//!   decompression for the builder's `-z` flag.

pub mod input;
pub mod logging;

pub use logging::{debug_enabled, set_debug_enabled};

/// Number of files-per-second since the previous checkpoint, for progress
/// lines. Returns 0 if no time has elapsed (matches the original's
/// `diff > 0 ? CHECKPOINT_INTERVAL / diff : 0` guard against division by zero).
pub fn files_per_second(count: u64, elapsed: std::time::Duration) -> u64 {
    let secs = elapsed.as_secs();
    if secs > 0 {
        count / secs
    } else {
        0
    }
}
