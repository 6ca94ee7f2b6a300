//! `ngram4-merge` — the merger CLI (§6 "Merger CLI").
//!
//! Migrated from `original_source/src/tools/merge.c`'s `main` argv handling:
//! `merge <offset> <limit> <out_dir> <in_dir_1> <size_1> <in_dir_2> <size_2>
//! [...]`, at least two input indices, argv length must be even. SIGINT sets
//! a graceful-stop flag checked at the next ABC-key boundary.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ngram4::merge::{run, MergeConfig, MergeInput};
use ngram4::MergeError;

/// Merges two or more independently-built indices into one.
#[derive(Parser, Debug)]
#[command(name = "ngram4-merge", author, version, about)]
struct Cli {
    /// First 24-bit ABC key to process.
    offset: u32,

    /// Number of ABC keys to process, starting at `offset`.
    limit: u32,

    /// Output directory for the merged index.
    out_dir: PathBuf,

    /// `<in_dir> <size>` pairs, at least two required.
    #[arg(num_args = 4.., value_name = "IN_DIR SIZE")]
    rest: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.rest.len() % 2 != 0 {
        bail!("expected an even number of `in_dir size` arguments, got {}", cli.rest.len());
    }
    let pairs = cli.rest.len() / 2;
    if pairs < 2 {
        bail!("merge requires at least two input indices, got {pairs}");
    }

    let mut inputs = Vec::with_capacity(pairs);
    for i in 0..pairs {
        let dir = PathBuf::from(&cli.rest[i * 2]);
        let size: u64 = cli.rest[i * 2 + 1]
            .parse()
            .with_context(|| format!("invalid size argument: {}", cli.rest[i * 2 + 1]))?;
        inputs.push(MergeInput { dir, size });
    }

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating output directory {}", cli.out_dir.display()))?;

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_for_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_for_handler.store(true, Ordering::SeqCst);
    })
    .context("failed to install SIGINT handler")?;

    let cfg = MergeConfig { out_dir: cli.out_dir, inputs };
    match run(&cfg, cli.offset, cli.limit, &cancel) {
        Ok(_) => Ok(()),
        Err(MergeError::Interrupted { last_key }) => {
            eprintln!("merge interrupted after key 0x{last_key:06x}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
