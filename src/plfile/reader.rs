//! Random-access reader over a single `.postlist` file.
//! Migrated from `plfile_init`/`seek_to_pl`/`pl_has_next`/`pl_get_next` in
//! `util/postinglistfile.h`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::{HEADER_LEN, NUM_D, SENTINEL};
use crate::varbyte;

/// A reader over one posting-list file. If the file does not exist, the
/// reader is constructed in the "empty" state and every query against it
/// reports no data, matching §4.2's `open` contract.
pub struct PlFileReader {
    file: Option<File>,
    offsets: [u64; NUM_D],
    /// State for the D currently being streamed, if any.
    cursor: Option<Cursor>,
}

struct Cursor {
    remaining: u64,
    accumulator: u32,
    first: bool,
}

impl PlFileReader {
    /// Opens `path`. A missing file yields an empty reader rather than an
    /// error, matching the original's "missing PL file means zero entries"
    /// convention.
    pub fn open(path: impl AsRef<Path>) -> io::Result<PlFileReader> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(PlFileReader {
                file: None,
                offsets: [SENTINEL; NUM_D],
                cursor: None,
            });
        }
        let mut file = File::open(path)?;
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)?;
        let mut offsets = [0u64; NUM_D];
        for (i, slot) in offsets.iter_mut().enumerate() {
            let bytes = &header[i * 8..i * 8 + 8];
            *slot = u64::from_le_bytes(bytes.try_into().unwrap());
        }
        Ok(PlFileReader {
            file: Some(file),
            offsets,
            cursor: None,
        })
    }

    /// `true` if this reader has no backing file at all.
    pub fn is_empty(&self) -> bool {
        self.file.is_none()
    }

    /// Number of entries in D's list without starting iteration, or `None`
    /// if D has no list. Convenience used by the matcher to record
    /// `(file, offset, count)` triples without consuming the stream.
    pub fn peek_count(&mut self, d: u8) -> io::Result<Option<u64>> {
        let offset = self.offsets[d as usize];
        if offset == SENTINEL {
            return Ok(None);
        }
        let file = match &mut self.file {
            Some(f) => f,
            None => return Ok(None),
        };
        file.seek(SeekFrom::Start(HEADER_LEN + offset))?;
        let mut count_bytes = [0u8; 8];
        file.read_exact(&mut count_bytes)?;
        Ok(Some(u64::from_le_bytes(count_bytes)))
    }

    /// Positions the reader at D's list, ready for `has_next`/`next`.
    pub fn seek_to(&mut self, d: u8) -> io::Result<()> {
        let offset = self.offsets[d as usize];
        if offset == SENTINEL {
            self.cursor = Some(Cursor { remaining: 0, accumulator: 0, first: true });
            return Ok(());
        }
        let file = match &mut self.file {
            Some(f) => f,
            None => {
                self.cursor = Some(Cursor { remaining: 0, accumulator: 0, first: true });
                return Ok(());
            }
        };
        file.seek(SeekFrom::Start(HEADER_LEN + offset))?;
        let mut count_bytes = [0u8; 8];
        file.read_exact(&mut count_bytes)?;
        let count = u64::from_le_bytes(count_bytes);
        self.cursor = Some(Cursor { remaining: count, accumulator: 0, first: true });
        Ok(())
    }

    /// `true` if another fid remains in the current list.
    pub fn has_next(&self) -> bool {
        matches!(&self.cursor, Some(c) if c.remaining > 0)
    }

    /// Reads the next fid from the current list: the first call reads a
    /// 4-byte absolute value, subsequent calls decode a varbyte delta and
    /// add it to the running accumulator.
    pub fn next(&mut self) -> io::Result<Option<u32>> {
        let file = match &mut self.file {
            Some(f) => f,
            None => return Ok(None),
        };
        let cursor = match &mut self.cursor {
            Some(c) if c.remaining > 0 => c,
            _ => return Ok(None),
        };
        let value = if cursor.first {
            let mut buf = [0u8; 4];
            file.read_exact(&mut buf)?;
            cursor.first = false;
            u32::from_le_bytes(buf)
        } else {
            let delta = varbyte::decode_from(file)?;
            cursor.accumulator.wrapping_add(delta)
        };
        cursor.accumulator = value;
        cursor.remaining -= 1;
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plfile::{HEADER_LEN, NUM_D, SENTINEL};
    use std::io::Write;
    use tempfile::tempdir;

    fn write_sample_pl(path: &Path, entries: &[(u8, Vec<u32>)]) {
        let mut offsets = [SENTINEL; NUM_D];
        let mut body = Vec::new();
        for (d, fids) in entries {
            offsets[*d as usize] = body.len() as u64;
            body.extend_from_slice(&(fids.len() as u64).to_le_bytes());
            body.extend_from_slice(&fids[0].to_le_bytes());
            let mut prev = fids[0];
            for &fid in &fids[1..] {
                crate::varbyte::encode(fid - prev, &mut body);
                prev = fid;
            }
        }
        let mut file = File::create(path).unwrap();
        for off in offsets.iter() {
            file.write_all(&off.to_le_bytes()).unwrap();
        }
        file.write_all(&body).unwrap();
        assert_eq!(HEADER_LEN, 256 * 8);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let reader = PlFileReader::open(dir.path().join("nope.postlist")).unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn reads_single_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.postlist");
        write_sample_pl(&path, &[(0x44, vec![0, 1])]);
        let mut reader = PlFileReader::open(&path).unwrap();
        reader.seek_to(0x44).unwrap();
        assert!(reader.has_next());
        assert_eq!(reader.next().unwrap(), Some(0));
        assert!(reader.has_next());
        assert_eq!(reader.next().unwrap(), Some(1));
        assert!(!reader.has_next());
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn sentinel_d_has_no_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.postlist");
        write_sample_pl(&path, &[(0x10, vec![5])]);
        let mut reader = PlFileReader::open(&path).unwrap();
        reader.seek_to(0x11).unwrap();
        assert!(!reader.has_next());
    }

    #[test]
    fn peek_count_does_not_consume() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.postlist");
        write_sample_pl(&path, &[(0x01, vec![0, 1, 2])]);
        let mut reader = PlFileReader::open(&path).unwrap();
        assert_eq!(reader.peek_count(0x01).unwrap(), Some(3));
        reader.seek_to(0x01).unwrap();
        assert_eq!(reader.next().unwrap(), Some(0));
    }
}
