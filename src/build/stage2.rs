//! Stage-2 converter — transforms each of the 2^16 prefiles into up to 256
//! posting-list files, one per high byte C of the 4-gram suffix.
//!
//! Migrated from `convert_prefile`/`converter_thread`/`build_stage_2` in
//! buildindex.c. The converter pool uses the same "claim next AB from a
//! shared counter" contract as stage 1's worker pools.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::config::{CHECKPOINT_INTERVAL, MAX_PLES};
use crate::error::BuildError;
use crate::grouping::{self, GroupTable};
use crate::ple::Ple;
use crate::plfile::{HEADER_LEN, NUM_D, SENTINEL};
use crate::varbyte;
use crate::{log_debug, log_info};

use super::prefile;

/// Parameters controlling stage 2.
pub struct Stage2Config {
    pub output_dir: PathBuf,
    pub num_workers: usize,
    pub keep_prefiles: bool,
    pub grouping_exponent: Option<u32>,
}

/// Runs stage 2 over all 2^16 prefixes, in parallel. Returns the total
/// number of prefixes scanned (2^16), matching the original's progress
/// counter, which advances for empty prefixes as well as populated ones.
pub fn run(cfg: &Stage2Config) -> Result<u64, BuildError> {
    let group_table = cfg.grouping_exponent.map(GroupTable::for_exponent);

    let next_prefix = AtomicU64::new(0);
    let converted = AtomicU64::new(0);
    let checkpoint = Mutex::new(Instant::now());
    let error: Mutex<Option<BuildError>> = Mutex::new(None);
    let num_workers = cfg.num_workers.max(1);

    rayon::scope(|scope| {
        for _ in 0..num_workers {
            scope.spawn(|_| loop {
                let ab = next_prefix.fetch_add(1, Ordering::SeqCst);
                if ab > 0xFFFF {
                    break;
                }
                if error.lock().unwrap().is_some() {
                    break;
                }
                if let Err(e) = convert_prefile(cfg, ab as u16, group_table.as_ref()) {
                    *error.lock().unwrap() = Some(e);
                    break;
                }
                let count = converted.fetch_add(1, Ordering::SeqCst) + 1;
                if count % CHECKPOINT_INTERVAL == 0 {
                    let mut last = checkpoint.lock().unwrap();
                    let elapsed = last.elapsed();
                    let fps = crate::util::files_per_second(CHECKPOINT_INTERVAL, elapsed);
                    log_info!("Finished converting {} prefixes, speed of {} fps", count, fps);
                    *last = Instant::now();
                }
            });
        }
    });

    if let Some(e) = error.into_inner().unwrap() {
        return Err(e);
    }
    Ok(converted.into_inner())
}

/// Converts one AB prefile into up to 256 `.postlist` files. Corresponds to
/// `convert_prefile`.
fn convert_prefile(
    cfg: &Stage2Config,
    ab: u16,
    group_table: Option<&GroupTable>,
) -> Result<(), BuildError> {
    let size = prefile::len(&cfg.output_dir, ab)?;
    if size == 0 {
        return Ok(());
    }
    if size > MAX_PLES {
        return Err(BuildError::Capacity {
            knob: "MAX_PLES",
            detail: format!("prefile {ab:04x} holds {size} PLEs"),
        });
    }

    let mut entries = prefile::read_all(&cfg.output_dir, ab)?;
    log_debug!("read {} PLEs from prefix {:04x}", entries.len(), ab);

    // Sort by (suffix, GROUP(fid, D)) ascending; ties collapse during the
    // dedup pass below. `d()` is derived from `suffix`, consistent with the
    // original comparator which reads `get_D(i)` off the same entry.
    entries.sort_by_key(|e| (e.suffix, grouping::group(e.fid, e.d(), group_table)));

    let mut i = 0usize;
    let n = entries.len();
    for c in 0u16..=0xFF {
        let c = c as u8;
        if i >= n {
            break;
        }
        if entries[i].c() != c {
            continue;
        }

        let mut offsets = [SENTINEL; NUM_D];
        let mut body: Vec<u8> = Vec::new();
        let mut current_d: Option<u8> = None;
        let mut last_gid: Option<u32> = None;
        let mut count_pos: usize = 0;

        while i < n && entries[i].c() == c {
            let d = entries[i].d();
            if current_d != Some(d) {
                debug_assert!(current_d.is_none() || d > current_d.unwrap());
                current_d = Some(d);
                last_gid = None;
                offsets[d as usize] = body.len() as u64;
                count_pos = body.len();
                body.extend_from_slice(&0u64.to_le_bytes());
            }

            let gid = grouping::group(entries[i].fid, d, group_table);
            if Some(gid) != last_gid {
                match last_gid {
                    None => {
                        body.extend_from_slice(&gid.to_le_bytes());
                    }
                    Some(prev) => {
                        debug_assert!(prev < gid);
                        varbyte::encode(gid - prev, &mut body);
                    }
                }
                last_gid = Some(gid);
                let count_bytes: [u8; 8] = body[count_pos..count_pos + 8].try_into().unwrap();
                let new_count = u64::from_le_bytes(count_bytes) + 1;
                body[count_pos..count_pos + 8].copy_from_slice(&new_count.to_le_bytes());
            }

            i += 1;
        }

        if !body.is_empty() {
            write_postlist(cfg, ab, c, &offsets, &body)?;
        }
    }

    debug_assert!(i == n || i == n + 1);

    if !cfg.keep_prefiles {
        prefile::remove(&cfg.output_dir, ab)?;
    }
    Ok(())
}

fn write_postlist(
    cfg: &Stage2Config,
    ab: u16,
    c: u8,
    offsets: &[u64; NUM_D],
    body: &[u8],
) -> Result<(), BuildError> {
    let dir = prefile::postlist_dir(&cfg.output_dir, ab);
    std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
    let path = prefile::postlist_path(&cfg.output_dir, ab, c, cfg.grouping_exponent);
    let mut file = File::create(&path).map_err(|e| BuildError::io(&path, e))?;
    debug_assert_eq!(HEADER_LEN, NUM_D as u64 * 8);
    for off in offsets.iter() {
        file.write_all(&off.to_le_bytes())
            .map_err(|e| BuildError::io(&path, e))?;
    }
    file.write_all(body).map_err(|e| BuildError::io(&path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram;
    use crate::plfile::PlFileReader;
    use tempfile::tempdir;

    fn default_cfg(output_dir: PathBuf) -> Stage2Config {
        Stage2Config {
            output_dir,
            num_workers: 2,
            keep_prefiles: false,
            grouping_exponent: None,
        }
    }

    #[test]
    fn single_entry_produces_single_fid_list() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("out");
        let ngram = 0x4142_4344u32;
        let ab = ngram::prefix(ngram);
        prefile::append(&root, ab, &[Ple::new(ngram::suffix(ngram), 0)]).unwrap();

        let cfg = default_cfg(root.clone());
        run(&cfg).unwrap();

        let c = ngram::suffix_high(ngram::suffix(ngram));
        let d = ngram::suffix_low(ngram::suffix(ngram));
        let path = prefile::postlist_path(&root, ab, c, None);
        let mut reader = PlFileReader::open(&path).unwrap();
        reader.seek_to(d).unwrap();
        assert_eq!(reader.next().unwrap(), Some(0));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn cross_file_dedup_and_delta_encoding() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("out");
        let ngram = 0x0102_0304u32;
        let ab = ngram::prefix(ngram);
        let suffix = ngram::suffix(ngram);
        prefile::append(
            &root,
            ab,
            &[Ple::new(suffix, 0), Ple::new(suffix, 1), Ple::new(suffix, 1)],
        )
        .unwrap();

        let cfg = default_cfg(root.clone());
        run(&cfg).unwrap();

        let c = ngram::suffix_high(suffix);
        let d = ngram::suffix_low(suffix);
        let path = prefile::postlist_path(&root, ab, c, None);
        let mut reader = PlFileReader::open(&path).unwrap();
        reader.seek_to(d).unwrap();
        assert_eq!(reader.next().unwrap(), Some(0));
        assert_eq!(reader.next().unwrap(), Some(1));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn empty_index_produces_no_postlist_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("out");
        std::fs::create_dir_all(&root).unwrap();
        let cfg = default_cfg(root.clone());
        run(&cfg).unwrap();
        assert!(!root.join("00").join("00").exists());
    }

    #[test]
    fn prefiles_deleted_unless_kept() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("out");
        let ngram = 0x0506_0708u32;
        let ab = ngram::prefix(ngram);
        prefile::append(&root, ab, &[Ple::new(ngram::suffix(ngram), 0)]).unwrap();

        let mut cfg = default_cfg(root.clone());
        cfg.keep_prefiles = true;
        run(&cfg).unwrap();
        assert!(prefile::prefile_path(&root, ab).exists());
    }
}
