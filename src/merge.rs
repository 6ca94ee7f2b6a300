//! K-way merger — combines posting-list files from multiple independently
//! built indices into one, rebasing file identifiers by per-index shifts.
//!
//! Migrated from merge.c's `main`. One naming deviation from the original:
//! the original writes merged output as `<C>.postlist_merged` alongside the
//! untouched `.postlist` sources, leaving a separate rename step implicit.
//! This crate writes merged files directly as `<C>.postlist` in the output
//! directory, so the merged directory is immediately queryable by
//! [`crate::plfile::PlFileReader`] and [`crate::matcher::Matcher`] without a
//! manual rename pass (see DESIGN.md).

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::MERGE_PROGRESS_INTERVAL;
use crate::error::MergeError;
use crate::plfile::{HEADER_LEN, NUM_D, SENTINEL};

/// One input index: its unpacked directory root and the number of fids it
/// contains (used to compute this index's shift).
pub struct MergeInput {
    pub dir: PathBuf,
    pub size: u64,
}

/// Parameters for one merge invocation.
pub struct MergeConfig {
    pub out_dir: PathBuf,
    pub inputs: Vec<MergeInput>,
}

impl MergeConfig {
    /// `shift[i] = sum of sizes of indices < i`, per §4.6.
    fn shifts(&self) -> Vec<u64> {
        let mut shifts = Vec::with_capacity(self.inputs.len());
        let mut running = 0u64;
        for input in &self.inputs {
            shifts.push(running);
            running += input.size;
        }
        shifts
    }
}

fn in_path(dir: &Path, ab: u16, c: u8) -> PathBuf {
    dir.join(format!("{:02x}", ab >> 8))
        .join(format!("{:02x}", ab & 0xFF))
        .join(format!("{c:02x}.postlist"))
}

fn out_path(dir: &Path, ab: u16, c: u8, tmp: bool) -> PathBuf {
    let ext = if tmp { "postlist_tmp" } else { "postlist" };
    dir.join(format!("{:02x}", ab >> 8))
        .join(format!("{:02x}", ab & 0xFF))
        .join(format!("{c:02x}.{ext}"))
}

/// A single opened input posting-list file for one ABC key, or `None` if
/// that index has no file for this key.
struct OpenInput {
    file: File,
    offsets: [u64; NUM_D],
    shift: u64,
}

fn open_input(path: &Path, shift: u64) -> std::io::Result<Option<OpenInput>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut file = File::open(path)?;
    let mut header = [0u8; HEADER_LEN as usize];
    file.read_exact(&mut header)?;
    let mut offsets = [0u64; NUM_D];
    for (i, slot) in offsets.iter_mut().enumerate() {
        *slot = u64::from_le_bytes(header[i * 8..i * 8 + 8].try_into().unwrap());
    }
    Ok(Some(OpenInput { file, offsets, shift }))
}

/// Runs the merge over 24-bit keys `[offset, offset + limit)`. `cancel` is
/// checked at every key boundary; when set, the merge stops gracefully and
/// returns [`MergeError::Interrupted`] with the last key fully written.
/// Mirrors merge.c's `for` loop over `[offset, offset+limit) && !interrupted`.
pub fn run(cfg: &MergeConfig, offset: u32, limit: u32, cancel: &AtomicBool) -> Result<u32, MergeError> {
    assert!(cfg.inputs.len() >= 2, "merge requires at least two input indices");
    let shifts = cfg.shifts();
    let mut last_key = offset;

    for key in offset..offset.saturating_add(limit) {
        if cancel.load(Ordering::Relaxed) {
            return Err(MergeError::Interrupted { last_key });
        }
        let ab = (key >> 8) as u16;
        let c = (key & 0xFF) as u8;
        merge_one_key(cfg, &shifts, ab, c)?;
        last_key = key;

        let processed = key - offset + 1;
        if processed % MERGE_PROGRESS_INTERVAL as u32 == 0 || processed == limit {
            let pct = 100.0 * processed as f64 / limit.max(1) as f64;
            eprint!("\r[+] {processed}/{limit} ({pct:.2}%)");
            if processed == limit {
                eprintln!();
            }
        }
    }
    Ok(last_key)
}

fn merge_one_key(
    cfg: &MergeConfig,
    shifts: &[u64],
    ab: u16,
    c: u8,
) -> Result<(), MergeError> {
    let final_path = out_path(&cfg.out_dir, ab, c, false);
    if final_path.exists() {
        return Ok(());
    }

    let mut inputs: Vec<Option<OpenInput>> = Vec::with_capacity(cfg.inputs.len());
    for (input, &shift) in cfg.inputs.iter().zip(shifts.iter()) {
        let path = in_path(&input.dir, ab, c);
        inputs.push(open_input(&path, shift).map_err(|e| MergeError::io(&path, e))?);
    }
    if inputs.iter().all(Option::is_none) {
        return Ok(());
    }

    let tmp_path = out_path(&cfg.out_dir, ab, c, true);
    if let Some(parent) = tmp_path.parent() {
        fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
    }
    let mut out = File::create(&tmp_path).map_err(|e| MergeError::io(&tmp_path, e))?;
    out.seek(SeekFrom::Start(HEADER_LEN))
        .map_err(|e| MergeError::io(&tmp_path, e))?;

    let mut final_offsets = [SENTINEL; NUM_D];

    for d in 0u16..NUM_D as u16 {
        let d = d as u8;
        let list_start = out.stream_position().map_err(|e| MergeError::io(&tmp_path, e))? - HEADER_LEN;
        let mut list_size: u64 = 0;
        let mut running_fid: u32 = 0;

        for input in inputs.iter_mut().flatten() {
            let offset = input.offsets[d as usize];
            if offset == SENTINEL {
                continue;
            }
            input
                .file
                .seek(SeekFrom::Start(HEADER_LEN + offset))
                .map_err(|e| MergeError::io(&tmp_path, e))?;
            let mut count_bytes = [0u8; 8];
            input
                .file
                .read_exact(&mut count_bytes)
                .map_err(|e| MergeError::io(&tmp_path, e))?;
            let count = u64::from_le_bytes(count_bytes);
            if count == 0 {
                continue;
            }
            let mut first_bytes = [0u8; 4];
            input
                .file
                .read_exact(&mut first_bytes)
                .map_err(|e| MergeError::io(&tmp_path, e))?;
            let first_fid = u32::from_le_bytes(first_bytes)
                .checked_add(input.shift as u32)
                .expect("merged fid overflowed u32");

            if list_size == 0 {
                out.write_all(&0u64.to_le_bytes())
                    .map_err(|e| MergeError::io(&tmp_path, e))?;
                out.write_all(&first_fid.to_le_bytes())
                    .map_err(|e| MergeError::io(&tmp_path, e))?;
            } else {
                let delta = first_fid - running_fid;
                let mut buf = Vec::new();
                crate::varbyte::encode(delta, &mut buf);
                out.write_all(&buf).map_err(|e| MergeError::io(&tmp_path, e))?;
            }
            running_fid = first_fid;
            list_size += count;

            // Same-index deltas are unaffected by the shift: copy their
            // encoded bytes verbatim, decoding only to keep `running_fid`
            // current for the next index's boundary transcoding.
            running_fid = copy_deltas_verbatim(&mut input.file, count, &mut out, running_fid)
                .map_err(|e| MergeError::io(&tmp_path, e))?;
        }

        if list_size > 0 {
            final_offsets[d as usize] = list_start;
            let after = out.stream_position().map_err(|e| MergeError::io(&tmp_path, e))?;
            out.seek(SeekFrom::Start(HEADER_LEN + list_start))
                .map_err(|e| MergeError::io(&tmp_path, e))?;
            out.write_all(&list_size.to_le_bytes())
                .map_err(|e| MergeError::io(&tmp_path, e))?;
            out.seek(SeekFrom::Start(after))
                .map_err(|e| MergeError::io(&tmp_path, e))?;
        }
    }

    out.seek(SeekFrom::Start(0)).map_err(|e| MergeError::io(&tmp_path, e))?;
    for off in final_offsets.iter() {
        out.write_all(&off.to_le_bytes())
            .map_err(|e| MergeError::io(&tmp_path, e))?;
    }
    drop(out);

    fs::rename(&tmp_path, &final_path).map_err(|e| MergeError::io(&final_path, e))?;
    Ok(())
}

/// Reads `count - 1` varbyte-encoded deltas from `reader`, writing their raw
/// bytes unchanged to `out` (same-index deltas need no recoding under a
/// shift), while decoding each one to advance `acc`. Returns the final
/// accumulated fid. Mirrors merge.c's chunked `fread`/`fwrite` copy loop,
/// at per-value rather than 128-byte-chunk granularity.
fn copy_deltas_verbatim<R: Read, W: Write>(
    reader: &mut R,
    count: u64,
    out: &mut W,
    mut acc: u32,
) -> std::io::Result<u32> {
    for _ in 1..count {
        let mut value: u32 = 0;
        let mut shift = 0u32;
        loop {
            let mut byte = [0u8; 1];
            reader.read_exact(&mut byte)?;
            out.write_all(&byte)?;
            value |= ((byte[0] & 0x7F) as u32) << shift;
            if byte[0] & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        acc = acc.wrapping_add(value);
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{self, BuildConfig};
    use crate::ngram;
    use crate::plfile::PlFileReader;
    use tempfile::tempdir;

    fn build_index(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let list_path = dir.join(format!("{}.list", files[0].0));
        let mut list = String::new();
        for (name, content) in files {
            let path = dir.join(name);
            std::fs::write(&path, content).unwrap();
            list.push_str(&format!("{}\n", path.display()));
        }
        std::fs::write(&list_path, list).unwrap();

        let out = dir.join(format!("{}_out", files[0].0));
        let mut cfg = BuildConfig::new(list_path, out.clone());
        cfg.w_read = 1;
        cfg.w_ng = 2;
        cfg.num_stage2_workers = 1;
        build::run_all(&cfg).unwrap();
        out
    }

    #[test]
    fn merges_two_indices_with_shift() {
        let dir = tempdir().unwrap();
        let ngram = 0x0102_0304u32;
        let payload = [0x01, 0x02, 0x03, 0x04];

        let out_x = build_index(dir.path(), &[("f0", &payload), ("f1", b"zzzz")]);
        let out_y = build_index(dir.path(), &[("f2", &payload)]);

        let merged_out = dir.path().join("merged");
        std::fs::create_dir_all(&merged_out).unwrap();
        let cfg = MergeConfig {
            out_dir: merged_out.clone(),
            inputs: vec![
                MergeInput { dir: out_x, size: 2 },
                MergeInput { dir: out_y, size: 1 },
            ],
        };
        let cancel = AtomicBool::new(false);
        run(&cfg, 0, 1 << 24, &cancel).unwrap();

        let ab = ngram::prefix(ngram);
        let c = ngram::suffix_high(ngram::suffix(ngram));
        let d = ngram::suffix_low(ngram::suffix(ngram));
        let path = out_path(&merged_out, ab, c, false);
        let mut reader = PlFileReader::open(&path).unwrap();
        reader.seek_to(d).unwrap();
        assert_eq!(reader.next().unwrap(), Some(0));
        assert_eq!(reader.next().unwrap(), Some(2));
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn existing_merged_file_is_skipped() {
        let dir = tempdir().unwrap();
        let out_x = build_index(dir.path(), &[("f0", b"aaaa")]);
        let out_y = build_index(dir.path(), &[("f1", b"bbbb")]);
        let merged_out = dir.path().join("merged");
        std::fs::create_dir_all(&merged_out).unwrap();

        let cfg = MergeConfig {
            out_dir: merged_out.clone(),
            inputs: vec![
                MergeInput { dir: out_x, size: 1 },
                MergeInput { dir: out_y, size: 1 },
            ],
        };
        let cancel = AtomicBool::new(false);
        run(&cfg, 0, 1 << 24, &cancel).unwrap();

        // Running again must not error even though merged files now exist.
        run(&cfg, 0, 1 << 24, &cancel).unwrap();
    }

    #[test]
    fn interruption_stops_before_limit() {
        let dir = tempdir().unwrap();
        let out_x = build_index(dir.path(), &[("f0", b"aaaa")]);
        let out_y = build_index(dir.path(), &[("f1", b"bbbb")]);
        let merged_out = dir.path().join("merged");
        std::fs::create_dir_all(&merged_out).unwrap();

        let cfg = MergeConfig {
            out_dir: merged_out,
            inputs: vec![
                MergeInput { dir: out_x, size: 1 },
                MergeInput { dir: out_y, size: 1 },
            ],
        };
        let cancel = AtomicBool::new(true);
        let err = run(&cfg, 0, 1 << 24, &cancel).unwrap_err();
        assert!(matches!(err, MergeError::Interrupted { last_key: 0 }));
    }
}
