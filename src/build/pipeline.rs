//! Top-level build orchestration: directory initialization plus stage 1 and
//! stage 2 dispatch. Migrated from buildindex.c's `main`,
//! `init_postinglist_directories`, `build_stage_1`, `build_stage_2`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::config::{
    MAX_INPUT_FILE_SIZE, MAX_NUM_FILE_NAMES, NUM_STAGE2_WORKERS_DEFAULT, W_NG_DEFAULT,
    W_READ_DEFAULT,
};
use crate::error::BuildError;
use crate::util::input::read_filename_list;
use crate::log_info;

use super::stage1::{self, Stage1Config};
use super::stage2::{self, Stage2Config};

/// Full set of knobs for a build run, corresponding to the builder CLI's
/// flags (§6).
pub struct BuildConfig {
    pub input_file_list: PathBuf,
    pub output_dir: PathBuf,
    pub max_files: usize,
    pub w_read: usize,
    pub w_ng: usize,
    pub num_stage2_workers: usize,
    pub max_input_file_size: u64,
    pub use_gzip: bool,
    pub omit_zero_bytes: bool,
    pub grouping_exponent: Option<u32>,
    pub keep_prefiles: bool,
}

impl BuildConfig {
    pub fn new(input_file_list: PathBuf, output_dir: PathBuf) -> Self {
        BuildConfig {
            input_file_list,
            output_dir,
            max_files: MAX_NUM_FILE_NAMES,
            w_read: W_READ_DEFAULT,
            w_ng: W_NG_DEFAULT,
            num_stage2_workers: NUM_STAGE2_WORKERS_DEFAULT,
            max_input_file_size: MAX_INPUT_FILE_SIZE,
            use_gzip: false,
            omit_zero_bytes: false,
            grouping_exponent: None,
            keep_prefiles: false,
        }
    }
}

/// Creates the `<root>/<AB_high>/<AB_low>` directory tree stage 1 writes
/// prefiles into. Corresponds to `init_postinglist_directories`. Stage 2's
/// own per-AB postlist subdirectories are created lazily as they are
/// populated (see `stage2::write_postlist`), since most of the 2^16 AB
/// slots never receive prefile content in a small run.
pub fn run_init(cfg: &BuildConfig) -> Result<(), BuildError> {
    (0u32..256)
        .into_par_iter()
        .try_for_each(|first| -> Result<(), BuildError> {
            let dir = cfg.output_dir.join(format!("{first:02x}"));
            std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))
        })
}

/// Runs stage 1 (ingest) over the input file list.
pub fn run_stage1(cfg: &BuildConfig) -> Result<u64, BuildError> {
    let filenames = read_filename_list(&cfg.input_file_list, cfg.max_files)
        .map_err(|e| BuildError::io(&cfg.input_file_list, e))?;
    log_info!("read {} filenames, starting stage 1", filenames.len());

    let stage1_cfg = Stage1Config {
        output_dir: cfg.output_dir.clone(),
        w_read: cfg.w_read,
        w_ng: cfg.w_ng,
        max_input_file_size: cfg.max_input_file_size,
        omit_zero_bytes: cfg.omit_zero_bytes,
        use_gzip: cfg.use_gzip,
    };
    stage1::run(&stage1_cfg, &filenames)
}

/// Runs stage 2 (convert) over the prefiles stage 1 produced.
pub fn run_stage2(cfg: &BuildConfig) -> Result<u64, BuildError> {
    log_info!("starting stage 2");
    let stage2_cfg = Stage2Config {
        output_dir: cfg.output_dir.clone(),
        num_workers: cfg.num_stage2_workers,
        keep_prefiles: cfg.keep_prefiles,
        grouping_exponent: cfg.grouping_exponent,
    };
    stage2::run(&stage2_cfg)
}

/// Runs directory init, stage 1, and stage 2 in sequence. Corresponds to
/// `main`'s default (`do_all`) path.
pub fn run_all(cfg: &BuildConfig) -> Result<(), BuildError> {
    run_init(cfg)?;
    run_stage1(cfg)?;
    run_stage2(cfg)?;
    Ok(())
}

/// Total number of distinct output directories `run_init` creates (one per
/// high byte of AB); used by tests asserting the directory layout.
pub fn num_init_dirs() -> u64 {
    static COUNT: AtomicU64 = AtomicU64::new(256);
    COUNT.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_high_byte_directories() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("idx");
        let cfg = BuildConfig::new(dir.path().join("list.txt"), out.clone());
        run_init(&cfg).unwrap();
        assert!(out.join("00").is_dir());
        assert!(out.join("ff").is_dir());
    }

    #[test]
    fn full_pipeline_single_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("f0.bin");
        std::fs::write(&input, [0x41, 0x42, 0x43, 0x44, 0x45]).unwrap();
        let list_path = dir.path().join("list.txt");
        std::fs::write(&list_path, format!("{}\n", input.display())).unwrap();

        let out = dir.path().join("idx");
        let mut cfg = BuildConfig::new(list_path, out.clone());
        cfg.w_read = 1;
        cfg.w_ng = 2;
        cfg.num_stage2_workers = 1;
        run_all(&cfg).unwrap();

        let ngram = 0x4142_4344u32;
        let ab = crate::ngram::prefix(ngram);
        let c = crate::ngram::suffix_high(crate::ngram::suffix(ngram));
        let d = crate::ngram::suffix_low(crate::ngram::suffix(ngram));
        let path = super::super::prefile::postlist_path(&out, ab, c, None);
        let mut reader = crate::plfile::PlFileReader::open(&path).unwrap();
        reader.seek_to(d).unwrap();
        assert_eq!(reader.next().unwrap(), Some(0));
    }
}
