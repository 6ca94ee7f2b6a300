//! Library-level error types.
//!
//! Small, explicit enums rather than a boxed catch-all, matching the block
//! codec's own `Lz4Error`/`DecompressError` style: callers match on the
//! variant they care about instead of downcasting. The CLI binaries wrap
//! these in `anyhow::Result` at the argument-parsing/dispatch boundary;
//! library code never depends on `anyhow`.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised by the index builder (stage 1, stage 2, directory init).
#[derive(Debug)]
pub enum BuildError {
    /// An I/O failure on an input file or an index output file.
    Io { path: PathBuf, source: io::Error },
    /// A prefile exceeded `MAX_PLES`, or an input file exceeded
    /// `MAX_INPUT_FILE_SIZE`. Names the knob the operator should raise.
    Capacity { knob: &'static str, detail: String },
    /// An allocation of a stage-2 PLE or PL scratch buffer failed.
    /// Names the knob the operator should lower.
    Allocation { knob: &'static str, detail: String },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            BuildError::Capacity { knob, detail } => {
                write!(f, "capacity exceeded ({detail}); increase {knob}")
            }
            BuildError::Allocation { knob, detail } => {
                write!(f, "allocation failed ({detail}); decrease {knob}")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BuildError::Io { path: path.into(), source }
    }
}

/// Errors raised by the merger.
#[derive(Debug)]
pub enum MergeError {
    /// An I/O failure opening, reading, or writing an index file.
    Io { path: PathBuf, source: io::Error },
    /// A SIGINT was observed; the merge stopped at the next key boundary.
    /// Not fatal — completed keys remain valid.
    Interrupted { last_key: u32 },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
            MergeError::Interrupted { last_key } => {
                write!(f, "merge interrupted after key 0x{last_key:06x}")
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::Io { source, .. } => Some(source),
            MergeError::Interrupted { .. } => None,
        }
    }
}

impl MergeError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MergeError::Io { path: path.into(), source }
    }
}

/// Errors raised by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    /// The result set could not be allocated or populated. Distinct from a
    /// valid, empty result — callers must not treat the two the same way.
    ResultAlloc,
    /// More n-grams were supplied than fit in the `u16` match counter.
    TooManyNgrams,
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::ResultAlloc => write!(f, "failed to allocate match result set"),
            MatchError::TooManyNgrams => write!(f, "query n-gram count exceeds u16::MAX"),
        }
    }
}

impl std::error::Error for MatchError {}
