// config.rs — Tunable constants for the build, merge, and match pipelines.
// Migrated from buildindex.h (tool constants) and util/postinglistfile.h.
//
// These are compile-time defaults; the CLI binaries expose the ones that
// make sense to override per run (worker counts, capacity bounds) as flags,
// falling back to these values.

/// Number of outer worker threads reading input files in stage 1.
/// Corresponds to `NUM_READ_WORKERS` in buildindex.h.
pub const W_READ_DEFAULT: usize = 8;

/// Number of inner worker threads per outer worker extracting 4-grams
/// from one input file in stage 1.
/// Corresponds to `NUM_NGRAM_WORKERS` in buildindex.h.
pub const W_NG_DEFAULT: usize = 16;

/// Number of stage-2 converter workers.
/// Corresponds to `NUM_STAGE2_WORKERS` in buildindex.h.
///
/// Increasing this requires significantly more RAM (roughly
/// `7 * MAX_PLES` bytes per additional worker in the original tool).
pub const NUM_STAGE2_WORKERS_DEFAULT: usize = 6;

/// Capacity, in PLEs, of each per-AB-prefix in-memory buffer in stage 1.
/// Corresponds to `MAX_IN_MEM_PL_SIZE`.
pub const MAX_IN_MEM_PL: usize = 1024;

/// Maximum size of an input file after optional decompression.
/// Corresponds to `MAX_INPUT_FILE_SIZE` (2 GiB).
pub const MAX_INPUT_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Maximum number of PLEs a single prefile may hold; stage 2 allocates a
/// buffer of this size per worker. Corresponds to `MAX_PLEs`.
pub const MAX_PLES: u64 = 4_000_000_000;

/// Maximum size (in PLEs) of the scratch buffer stage 2 uses to assemble
/// one AB's worth of posting lists before writing them out. Corresponds
/// to `MAX_PL_SIZE`, which in the original tool equals `MAX_PLEs`.
pub const MAX_PL_SIZE: u64 = MAX_PLES;

/// How many files (stage 1) or prefixes (stage 2) are processed between
/// progress log lines. Corresponds to `CHECKPOINT_INTERVAL`.
pub const CHECKPOINT_INTERVAL: u64 = 1000;

/// Default size of the matcher's file-identifier counter array, matching
/// the original tool's hard-coded `NUM_FIDS`. This implementation makes it
/// a `Matcher::new` constructor argument instead of a compile-time bound;
/// this constant is only the default when the caller does not know the
/// true fid count.
pub const N_FIDS_DEFAULT: u32 = 32_321_740;

/// Minimum and maximum accepted grouping exponent for `-g`.
pub const GROUPING_EXPONENT_MIN: u32 = 8;
pub const GROUPING_EXPONENT_MAX: u32 = 30;

/// Number of primes kept per grouping exponent in the synthesized table.
/// The 4-gram's low byte D is reduced modulo this count to select which
/// prime in the exponent's row applies; see `grouping.rs`.
pub const GROUPING_PRIMES_PER_EXPONENT: usize = 256;

/// How many keys the merger processes between progress lines.
pub const MERGE_PROGRESS_INTERVAL: u64 = 100;

/// Chunk size used when bulk-copying same-index delta bytes during a merge.
pub const MERGE_COPY_CHUNK: usize = 128;

/// Default cap on the number of input files read from `-r`'s file list when
/// the caller does not pass `-n`. Corresponds to `MAX_NUM_FILE_NAMES`.
pub const MAX_NUM_FILE_NAMES: usize = 1_000_000 + 1;
