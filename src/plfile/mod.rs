//! On-disk posting-list (`.postlist`) file format and reader.
//!
//! Migrated from `util/postinglistfile.h` (`struct PLFile` and its
//! `plfile_init`/`seek_to_pl`/`pl_has_next`/`pl_get_next` functions) and the
//! writer side of `convert_prefile` in buildindex.c.
//!
//! Layout (little-endian throughout):
//! - 256 x u64 offsets, one per suffix low byte D, relative to the end of
//!   this header. [`SENTINEL`] means "no list for this D".
//! - body: for each D with an offset, a u64 count, then a u32 absolute
//!   first fid, then `count - 1` varbyte-encoded positive deltas.

pub mod reader;

pub use reader::PlFileReader;

/// Number of offset slots in a posting-list file's header (one per D).
pub const NUM_D: usize = 256;

/// Size in bytes of the fixed header.
pub const HEADER_LEN: u64 = NUM_D as u64 * 8;

/// Offset value meaning "no posting list for this D".
pub const SENTINEL: u64 = u64::MAX;

/// Builds the file-name suffix appended when grouping is active
/// (e.g. `-g16`), or an empty string otherwise.
pub fn grouping_suffix(grouping_exponent: Option<u32>) -> String {
    match grouping_exponent {
        Some(g) => format!("-g{g}"),
        None => String::new(),
    }
}
