//! `ngram4-build` — the index builder CLI (§6 "Builder CLI").
//!
//! Migrated from `original_source/src/tools/buildindex.c`'s `main`/`getopt`
//! loop, restructured onto `clap`'s derive API. The teacher crate already
//! depends on `clap` for its own CLI surface even though its particular
//! parser hand-rolls option aggregation for migration-fidelity reasons; this
//! binary's CLI is new, so it uses `clap` directly rather than hand-rolling.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ngram4::config::{GROUPING_EXPONENT_MAX, GROUPING_EXPONENT_MIN, MAX_NUM_FILE_NAMES};
use ngram4::{run_all, run_init, run_stage1, run_stage2, BuildConfig};

/// Builds a 4-gram inverted index over a corpus of input files.
#[derive(Parser, Debug)]
#[command(name = "ngram4-build", author, version, about)]
struct Cli {
    /// Newline-delimited list of input file paths.
    #[arg(short = 'r', long = "file-list", value_name = "PATH")]
    file_list: PathBuf,

    /// Output directory for the index.
    #[arg(short = 'w', long = "out-dir", value_name = "DIR")]
    out_dir: PathBuf,

    /// Cap on the number of files read from the file list.
    #[arg(short = 'n', long = "max-files", value_name = "N")]
    max_files: Option<usize>,

    /// Run only directory initialization.
    #[arg(short = 'i', long = "init-only", conflicts_with_all = ["stage1_only", "stage2_only"])]
    init_only: bool,

    /// Run only stage 1 (ingest into prefiles).
    #[arg(short = '1', long = "stage1-only", conflicts_with_all = ["init_only", "stage2_only"])]
    stage1_only: bool,

    /// Run only stage 2 (convert prefiles into posting-list files).
    #[arg(short = '2', long = "stage2-only", conflicts_with_all = ["init_only", "stage1_only"])]
    stage2_only: bool,

    /// Input files are gzip-compressed.
    #[arg(short = 'z', long = "gzip")]
    gzip: bool,

    /// Enable grouping with the given exponent (8-30).
    #[arg(short = 'g', long = "group", value_name = "EXP")]
    group: Option<u32>,

    /// Omit 4-grams containing any zero byte.
    #[arg(short = '0', long = "omit-zero-bytes")]
    omit_zero_bytes: bool,

    /// Keep stage-1 prefiles after stage 2 finishes.
    #[arg(short = 'k', long = "keep-prefiles")]
    keep_prefiles: bool,

    /// Verbose (debug-level) logging.
    #[arg(short = 'd', long = "verbose")]
    verbose: bool,

    /// Number of outer stage-1 worker threads.
    #[arg(long = "stage1-read-workers", value_name = "N")]
    w_read: Option<usize>,

    /// Number of inner stage-1 n-gram-extraction workers per file.
    #[arg(long = "stage1-ngram-workers", value_name = "N")]
    w_ng: Option<usize>,

    /// Number of stage-2 converter worker threads.
    #[arg(long = "stage2-workers", value_name = "N")]
    stage2_workers: Option<usize>,
}

fn main() -> Result<()> {
    // `pack` is a distinct verb with its own two-positional-argument shape
    // rather than another flag on the flag-rich build mode, so it is
    // dispatched on the raw argv before handing the rest to clap, the same
    // way the merger binary takes its arguments positionally instead of as
    // flags.
    let mut raw_args = std::env::args();
    let program = raw_args.next().unwrap_or_default();
    let rest: Vec<String> = raw_args.collect();
    if rest.first().map(String::as_str) == Some("pack") {
        return run_pack(&rest[1..]);
    }
    let _ = program;

    let cli = Cli::parse();
    ngram4::util::set_debug_enabled(cli.verbose);

    // Worker-count flags are optional; when absent, scale stage 1's outer
    // read pool and stage 2's converter pool to the machine's physical core
    // count rather than the fixed config.rs defaults, capping rather than
    // overriding so a low-core machine doesn't oversubscribe itself.

    if let Some(g) = cli.group {
        if !(GROUPING_EXPONENT_MIN..=GROUPING_EXPONENT_MAX).contains(&g) {
            bail!(
                "grouping exponent {g} out of range [{GROUPING_EXPONENT_MIN}, {GROUPING_EXPONENT_MAX}]"
            );
        }
    }

    let mut cfg = BuildConfig::new(cli.file_list.clone(), cli.out_dir.clone());
    cfg.max_files = cli.max_files.unwrap_or(MAX_NUM_FILE_NAMES);
    cfg.use_gzip = cli.gzip;
    cfg.grouping_exponent = cli.group;
    cfg.omit_zero_bytes = cli.omit_zero_bytes;
    cfg.keep_prefiles = cli.keep_prefiles;
    let physical_cores = num_cpus::get_physical();
    cfg.w_read = cli.w_read.unwrap_or_else(|| physical_cores.min(cfg.w_read));
    cfg.w_ng = cli.w_ng.unwrap_or(cfg.w_ng);
    cfg.num_stage2_workers = cli
        .stage2_workers
        .unwrap_or_else(|| physical_cores.min(cfg.num_stage2_workers));

    if cli.init_only {
        run_init(&cfg).context("directory initialization failed")?;
    } else if cli.stage1_only {
        run_init(&cfg).context("directory initialization failed")?;
        run_stage1(&cfg).context("stage 1 failed")?;
    } else if cli.stage2_only {
        run_stage2(&cfg).context("stage 2 failed")?;
    } else {
        run_all(&cfg).context("build failed")?;
    }

    Ok(())
}

/// `ngram4-build pack <index_dir> <out_base>` — tars an unpacked index
/// directory and writes its `.lookup` sidecar, enabling the matcher's
/// tar-mode entry point.
fn run_pack(args: &[String]) -> Result<()> {
    let [index_dir, out_base] = args else {
        bail!("usage: ngram4-build pack <index_dir> <out_base>");
    };
    ngram4::tar_index::pack(PathBuf::from(index_dir).as_path(), PathBuf::from(out_base).as_path())
        .context("packing index failed")?;
    Ok(())
}
