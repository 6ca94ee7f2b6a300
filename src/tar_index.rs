//! Tar-packed index mode (§6): packs an unpacked index directory into a
//! single `<base>` file plus a `<base>.lookup` sidecar, and resolves
//! n-grams against that sidecar for the matcher's tar-mode path.
//!
//! Migrated from `original_source/src/pymodule/malindexhelper.c`'s tar
//! branch of `Cmatch_posting_lists`: the lookup file is a flat table of
//! 2^24 8-byte absolute offsets, indexed by a byte-reversed 24-bit key.
//! `pack` is new supplemental functionality (the original's tar archives
//! were assembled by a separate, undistilled tool); it produces byte-for-
//! byte the same embedded `.postlist` layout the matcher expects, using the
//! `tar` crate only for ustar header construction/serialization so the
//! packed file remains a standard tar archive despite being read back by
//! absolute offset rather than via a tar reader.

use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use tar::Header;

use crate::ngram;

/// Number of distinct 24-bit ABC keys, and thus entries in a `.lookup` file.
const NUM_KEYS: usize = 1 << 24;

/// Byte-reverses a 24-bit key: `A|B|C -> C|B|A` (middle byte fixed, high and
/// low bytes swapped). Matches the `swap` bit manipulation in §6 exactly.
#[inline]
fn swap(key: u32) -> u32 {
    ((key & 0xFF_0000) >> 16) | (key & 0xFF00) | ((key & 0xFF) << 16)
}

fn lookup_path_for(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".lookup");
    PathBuf::from(name)
}

/// An opened tar-packed index: the `.lookup` table loaded into memory, and
/// the path of the packed archive (opened fresh per query by the matcher,
/// since a posting-list scan may hold several handles into it at once).
pub struct TarIndex {
    archive_path: PathBuf,
    lookup: Vec<u64>,
}

impl TarIndex {
    /// Opens `<base>.lookup` and validates its size. `<base>` itself is not
    /// opened here; [`TarIndex::open_handle`] opens a fresh handle per use.
    pub fn open(base: impl Into<PathBuf>) -> io::Result<TarIndex> {
        let archive_path = base.into();
        let lookup_path = lookup_path_for(&archive_path);
        let bytes = fs::read(&lookup_path)?;
        if bytes.len() != NUM_KEYS * 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} has {} bytes, expected {}",
                    lookup_path.display(),
                    bytes.len(),
                    NUM_KEYS * 8
                ),
            ));
        }
        let lookup = bytes
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(TarIndex { archive_path, lookup })
    }

    /// Resolves a 24-bit ABC key to the absolute byte offset of its embedded
    /// `.postlist` header within the archive, or `None` if no value is
    /// stored (a zero entry means "no file for this key").
    pub fn offset_for(&self, abc: u32) -> Option<u64> {
        let value = self.lookup[swap(abc) as usize % NUM_KEYS];
        if value == 0 {
            None
        } else {
            Some(value)
        }
    }

    /// Opens a fresh handle onto the packed archive.
    pub fn open_handle(&self) -> io::Result<File> {
        File::open(&self.archive_path)
    }
}

/// Packs the unpacked index directory at `root` into `<base_out>` and
/// `<base_out>.lookup`. Every `.postlist` file present in the 2-level hex
/// directory layout is appended as a ustar entry; the offset of its content
/// (immediately past its 512-byte header) is recorded in the lookup table
/// under the byte-reversed key of its ABC. Missing ABCs keep a zero entry.
pub fn pack(root: &Path, base_out: &Path) -> io::Result<()> {
    let mut lookup = vec![0u64; NUM_KEYS];
    let mut out = File::create(base_out)?;

    for a in 0u32..256 {
        for b in 0u32..256 {
            let dir = root.join(format!("{a:02x}")).join(format!("{b:02x}"));
            if !dir.is_dir() {
                continue;
            }
            for c in 0u32..256 {
                let file_path = dir.join(format!("{c:02x}.postlist"));
                let data = match fs::read(&file_path) {
                    Ok(d) => d,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e),
                };

                let mut header = Header::new_ustar();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_mtime(0);
                header.set_entry_type(tar::EntryType::Regular);
                header.set_path(format!("{a:02x}/{b:02x}/{c:02x}.postlist"))?;
                header.set_cksum();

                out.write_all(header.as_bytes())?;
                let content_offset = out.stream_position()?;
                out.write_all(&data)?;
                let padding = (512 - (data.len() % 512)) % 512;
                if padding > 0 {
                    out.write_all(&vec![0u8; padding])?;
                }

                let prefix = ((a as u16) << 8) | b as u16;
                let abc = ngram::abc_key(prefix, c as u8);
                lookup[swap(abc) as usize % NUM_KEYS] = content_offset;
            }
        }
    }

    // Two all-zero 512-byte blocks mark the end of a tar archive.
    out.write_all(&[0u8; 1024])?;
    out.flush()?;

    let lookup_path = lookup_path_for(base_out);
    let mut lookup_file = File::create(&lookup_path)?;
    for value in &lookup {
        lookup_file.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_reverses_high_and_low_bytes() {
        assert_eq!(swap(0x01_02_03), 0x03_02_01);
        assert_eq!(swap(0x00_00_00), 0x00_00_00);
        assert_eq!(swap(0xAB_CD_EF), 0xEF_CD_AB);
    }

    #[test]
    fn lookup_path_appends_suffix() {
        let base = Path::new("/idx/packed");
        assert_eq!(lookup_path_for(base), Path::new("/idx/packed.lookup"));
    }

    #[test]
    fn pack_then_resolve_round_trips() {
        use crate::build::{self, BuildConfig};
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let input = dir.path().join("f0.bin");
        std::fs::write(&input, [0x41, 0x42, 0x43, 0x44, 0x45]).unwrap();
        let list_path = dir.path().join("list.txt");
        std::fs::write(&list_path, format!("{}\n", input.display())).unwrap();

        let unpacked = dir.path().join("idx");
        let mut cfg = BuildConfig::new(list_path, unpacked.clone());
        cfg.w_read = 1;
        cfg.w_ng = 2;
        cfg.num_stage2_workers = 1;
        build::run_all(&cfg).unwrap();

        let packed_base = dir.path().join("packed");
        pack(&unpacked, &packed_base).unwrap();
        assert!(packed_base.exists());
        assert!(lookup_path_for(&packed_base).exists());

        let tar_index = TarIndex::open(&packed_base).unwrap();
        let ngram = 0x4142_4344u32;
        let prefix = ngram::prefix(ngram);
        let c = ngram::suffix_high(ngram::suffix(ngram));
        let abc = ngram::abc_key(prefix, c);
        let offset = tar_index.offset_for(abc);
        assert!(offset.is_some());
    }

    #[test]
    fn missing_key_resolves_to_none() {
        use tempfile::tempdir;
        let dir = tempdir().unwrap();
        let root = dir.path().join("empty_idx");
        std::fs::create_dir_all(&root).unwrap();
        let packed_base = dir.path().join("packed");
        pack(&root, &packed_base).unwrap();

        let tar_index = TarIndex::open(&packed_base).unwrap();
        assert_eq!(tar_index.offset_for(0x010203), None);
    }
}
