//! Index builder — the two-stage external-sort pipeline.
//!
//! Migrated from buildindex.c's `main`/`init_postinglist_directories`/
//! `build_stage_1`/`build_stage_2`. The original's process-global state
//! (per-prefix buffers, prefix counter, filename table) is replaced with
//! explicit context values (`Stage1Config`, `Stage2Config`, `BuildConfig`)
//! passed through the pipeline rather than shared statics.

pub mod pipeline;
pub mod prefile;
pub mod stage1;
pub mod stage2;

pub use pipeline::{run_all, run_init, run_stage1, run_stage2, BuildConfig};
