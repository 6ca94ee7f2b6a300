//! Prefile path layout and I/O.
//!
//! A prefile holds the unsorted PLEs for one 16-bit prefix AB, written in
//! append mode as stage-1 buffers fill. Migrated from the path construction
//! and read/write calls in `write_tmp_PLs_to_predefrag_files` and
//! `convert_prefile` (buildindex.c).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::ple::{Ple, PLE_WIRE_SIZE};

/// Path of the prefile for prefix `ab`: `<root>/<AB_high>/<AB_low>.prefile`.
pub fn prefile_path(root: &Path, ab: u16) -> PathBuf {
    root.join(format!("{:02x}", ab >> 8))
        .join(format!("{:02x}.prefile", ab & 0xFF))
}

/// Directory that will hold `ab`'s posting-list files:
/// `<root>/<AB_high>/<AB_low>/`.
pub fn postlist_dir(root: &Path, ab: u16) -> PathBuf {
    root.join(format!("{:02x}", ab >> 8))
        .join(format!("{:02x}", ab & 0xFF))
}

/// Path of the posting-list file for a given ABC and optional grouping
/// exponent: `<root>/<AB_high>/<AB_low>/<C>.postlist[-gN]`.
pub fn postlist_path(root: &Path, ab: u16, c: u8, grouping_exponent: Option<u32>) -> PathBuf {
    let suffix = crate::plfile::grouping_suffix(grouping_exponent);
    postlist_dir(root, ab).join(format!("{c:02x}.postlist{suffix}"))
}

/// Appends `entries` to `ab`'s prefile, creating it if necessary.
pub fn append(root: &Path, ab: u16, entries: &[Ple]) -> Result<(), BuildError> {
    if entries.is_empty() {
        return Ok(());
    }
    let path = prefile_path(root, ab);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| BuildError::io(&path, e))?;
    let mut buf = Vec::with_capacity(entries.len() * PLE_WIRE_SIZE);
    for e in entries {
        e.write_to(&mut buf);
    }
    file.write_all(&buf).map_err(|e| BuildError::io(&path, e))?;
    Ok(())
}

/// Reads every PLE out of `ab`'s prefile. Returns an empty vector if the
/// prefile does not exist (a prefix that received no entries at all).
pub fn read_all(root: &Path, ab: u16) -> Result<Vec<Ple>, BuildError> {
    let path = prefile_path(root, ab);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut file = File::open(&path).map_err(|e| BuildError::io(&path, e))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| BuildError::io(&path, e))?;
    if buf.len() % PLE_WIRE_SIZE != 0 {
        return Err(BuildError::Io {
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "prefile length is not a multiple of the PLE wire size",
            ),
        });
    }
    Ok(crate::ple::read_all(&buf))
}

/// Size, in PLEs, of `ab`'s prefile (0 if it does not exist).
pub fn len(root: &Path, ab: u16) -> Result<u64, BuildError> {
    let path = prefile_path(root, ab);
    if !path.exists() {
        return Ok(0);
    }
    let meta = fs::metadata(&path).map_err(|e| BuildError::io(&path, e))?;
    Ok(meta.len() / PLE_WIRE_SIZE as u64)
}

/// Deletes `ab`'s prefile, ignoring a not-found error (already cleaned up
/// or never created).
pub fn remove(root: &Path, ab: u16) -> Result<(), BuildError> {
    let path = prefile_path(root, ab);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(&path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let entries = vec![Ple::new(1, 10), Ple::new(2, 20)];
        append(dir.path(), 0x1234, &entries).unwrap();
        let read_back = read_all(dir.path(), 0x1234).unwrap();
        assert_eq!(read_back, entries);
    }

    #[test]
    fn append_twice_accumulates() {
        let dir = tempdir().unwrap();
        append(dir.path(), 1, &[Ple::new(1, 1)]).unwrap();
        append(dir.path(), 1, &[Ple::new(2, 2)]).unwrap();
        let read_back = read_all(dir.path(), 1).unwrap();
        assert_eq!(read_back, vec![Ple::new(1, 1), Ple::new(2, 2)]);
    }

    #[test]
    fn missing_prefile_reads_as_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(read_all(dir.path(), 0xFFFF).unwrap(), Vec::new());
        assert_eq!(len(dir.path(), 0xFFFF).unwrap(), 0);
    }

    #[test]
    fn paths_use_two_level_hex_layout() {
        let root = Path::new("/idx");
        assert_eq!(prefile_path(root, 0x0102), Path::new("/idx/01/02.prefile"));
        assert_eq!(postlist_dir(root, 0x0102), Path::new("/idx/01/02"));
        assert_eq!(
            postlist_path(root, 0x0102, 0xAB, None),
            Path::new("/idx/01/02/ab.postlist")
        );
        assert_eq!(
            postlist_path(root, 0x0102, 0xAB, Some(16)),
            Path::new("/idx/01/02/ab.postlist-g16")
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().unwrap();
        append(dir.path(), 5, &[Ple::new(1, 1)]).unwrap();
        remove(dir.path(), 5).unwrap();
        remove(dir.path(), 5).unwrap();
        assert_eq!(read_all(dir.path(), 5).unwrap(), Vec::new());
    }
}
