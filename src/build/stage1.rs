//! Stage-1 ingester — reads input files and routes their distinct 4-grams
//! into 2^16 in-memory buffers, spilling each to a prefile on disk when full.
//!
//! Migrated from `build_stage_1`/`stage1_thread`/`process_file`/
//! `sample_to_prefiles`/`flush_all_PLs_to_defrag_files` in buildindex.c. The
//! original's `pthread_create`/`pthread_join` worker pools and
//! shared-counter claim loops are expressed here as `rayon::scope` closures
//! looping on an `AtomicU64` index counter, matching the "claim next index"
//! contract the original's global lock enforces.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::config::{CHECKPOINT_INTERVAL, MAX_IN_MEM_PL};
use crate::error::BuildError;
use crate::ngram;
use crate::ple::Ple;
use crate::util::input::read_input_file;
use crate::{log_error, log_info};

use super::prefile;

/// Parameters controlling stage 1.
pub struct Stage1Config {
    pub output_dir: PathBuf,
    pub w_read: usize,
    pub w_ng: usize,
    pub max_input_file_size: u64,
    pub omit_zero_bytes: bool,
    pub use_gzip: bool,
}

/// One in-memory buffer per 16-bit prefix, guarded individually so that
/// outer workers colliding on the same AB serialize only against each
/// other, never against unrelated prefixes.
struct Buffers {
    slots: Vec<Mutex<Vec<Ple>>>,
}

impl Buffers {
    fn new() -> Self {
        let slots = (0..=u16::MAX as u32)
            .map(|_| Mutex::new(Vec::with_capacity(MAX_IN_MEM_PL)))
            .collect();
        Buffers { slots }
    }

    /// Appends `entry` to its prefix's buffer, flushing to disk first if the
    /// buffer is already at capacity. Mirrors the flush-on-full branch in
    /// `sample_to_prefiles`.
    fn push(&self, root: &Path, prefix: u16, entry: Ple) -> Result<(), BuildError> {
        let mut guard = self.slots[prefix as usize].lock().unwrap();
        if guard.len() >= MAX_IN_MEM_PL {
            prefile::append(root, prefix, &guard)?;
            guard.clear();
        }
        guard.push(entry);
        Ok(())
    }

    /// Flushes the buffer for `prefix` if it holds anything.
    fn flush(&self, root: &Path, prefix: u16) -> Result<(), BuildError> {
        let mut guard = self.slots[prefix as usize].lock().unwrap();
        if !guard.is_empty() {
            prefile::append(root, prefix, &guard)?;
            guard.clear();
        }
        Ok(())
    }
}

/// Runs stage 1 over `filenames`, assigning fid = index in the list (the
/// order filenames are consumed from the queue, per §5's ordering
/// guarantee). Returns the number of files ingested.
pub fn run(cfg: &Stage1Config, filenames: &[String]) -> Result<u64, BuildError> {
    let buffers = Buffers::new();
    let next_index = AtomicU64::new(0);
    let processed = AtomicU64::new(0);
    let checkpoint = Mutex::new(Instant::now());

    let num_threads = cfg.w_read.max(1);
    let error: Mutex<Option<BuildError>> = Mutex::new(None);

    rayon::scope(|scope| {
        for _ in 0..num_threads {
            scope.spawn(|_| loop {
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                if idx as usize >= filenames.len() {
                    break;
                }
                if error.lock().unwrap().is_some() {
                    break;
                }
                let fid = idx as u32;
                let fname = &filenames[idx as usize];
                if let Err(e) = ingest_file(cfg, &buffers, Path::new(fname), fid) {
                    log_error!("reading {} failed: {}", fname, e);
                    *error.lock().unwrap() = Some(e);
                    break;
                }
                let count = processed.fetch_add(1, Ordering::SeqCst) + 1;
                if count % CHECKPOINT_INTERVAL == 0 {
                    let mut last = checkpoint.lock().unwrap();
                    let elapsed = last.elapsed();
                    let fps = crate::util::files_per_second(CHECKPOINT_INTERVAL, elapsed);
                    log_info!("Finished processing {} files, speed of {} fps", count, fps);
                    *last = Instant::now();
                }
            });
        }
    });

    if let Some(e) = error.into_inner().unwrap() {
        return Err(e);
    }

    // Flush whatever is still buffered, parallelized across a shared counter
    // over all 2^16 prefixes, mirroring `flush_all_PLs_to_defrag_files`.
    let next_prefix = AtomicU64::new(0);
    let flush_error: Mutex<Option<BuildError>> = Mutex::new(None);
    rayon::scope(|scope| {
        for _ in 0..num_threads {
            scope.spawn(|_| loop {
                let p = next_prefix.fetch_add(1, Ordering::SeqCst);
                if p > 0xFFFF {
                    break;
                }
                if let Err(e) = buffers.flush(&cfg.output_dir, p as u16) {
                    *flush_error.lock().unwrap() = Some(e);
                    break;
                }
            });
        }
    });
    if let Some(e) = flush_error.into_inner().unwrap() {
        return Err(e);
    }

    Ok(processed.into_inner())
}

/// Reads one input file and fans its distinct 4-grams out to `W_ng` inner
/// workers partitioned by `prefix mod w_ng`, so no two inner workers ever
/// contend the same AB buffer for a single file. Corresponds to
/// `process_file` + `sample_to_prefiles`.
fn ingest_file(
    cfg: &Stage1Config,
    buffers: &Buffers,
    path: &Path,
    fid: u32,
) -> Result<(), BuildError> {
    let data = read_input_file(path, cfg.use_gzip, cfg.max_input_file_size)?;
    if data.len() < 4 {
        return Ok(());
    }

    let w_ng = cfg.w_ng.max(1);
    let error: Mutex<Option<BuildError>> = Mutex::new(None);

    rayon::scope(|scope| {
        for t in 0..w_ng {
            scope.spawn(|_| {
                let mut seen: HashSet<u32> = HashSet::new();
                for window in data.windows(4) {
                    let ngram = u32::from_be_bytes([window[0], window[1], window[2], window[3]]);
                    let prefix = ngram::prefix(ngram);
                    if (prefix as usize) % w_ng != t {
                        continue;
                    }
                    if cfg.omit_zero_bytes && ngram::contains_zero_byte(ngram) {
                        continue;
                    }
                    if !seen.insert(ngram) {
                        continue;
                    }
                    let suffix = ngram::suffix(ngram);
                    if let Err(e) = buffers.push(&cfg.output_dir, prefix, Ple::new(suffix, fid)) {
                        *error.lock().unwrap() = Some(e);
                        return;
                    }
                }
            });
        }
    });

    if let Some(e) = error.into_inner().unwrap() {
        return Err(e);
    }
    Ok(())
}
