//! Input-file reading for the stage-1 ingester.
//!
//! Migrated from `read_plainfile_into_buf`/`read_gzipfile_into_buf` in
//! buildindex.c. Unlike the original's fixed-size `MAX_INPUT_FILE_SIZE`
//! buffer filled by repeated `fread`/`gzread`, this reads into a `Vec<u8>`
//! and rejects the file once it would exceed the cap, since Rust has no
//! need to preallocate a worst-case buffer up front.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::BuildError;

/// Reads `path` fully into memory, applying gzip decompression first when
/// `gzip` is set. Fails with [`BuildError::Capacity`] if the (decompressed)
/// size would exceed `max_size`.
pub fn read_input_file(path: &Path, gzip: bool, max_size: u64) -> Result<Vec<u8>, BuildError> {
    let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    let bytes = if gzip {
        read_capped(GzDecoder::new(file), max_size, path)?
    } else {
        read_capped(file, max_size, path)?
    };
    Ok(bytes)
}

fn read_capped<R: Read>(mut reader: R, max_size: u64, path: &Path) -> Result<Vec<u8>, BuildError> {
    let mut buf = Vec::new();
    let limit = max_size.saturating_add(1);
    let mut taken = (&mut reader).take(limit);
    taken
        .read_to_end(&mut buf)
        .map_err(|e| BuildError::io(path, e))?;
    if buf.len() as u64 > max_size {
        return Err(BuildError::Capacity {
            knob: "MAX_INPUT_FILE_SIZE",
            detail: format!(
                "{} exceeds {} bytes after decompression",
                path.display(),
                max_size
            ),
        });
    }
    Ok(buf)
}

/// Reads `path` as a newline-delimited list of file paths, trimming
/// trailing whitespace from each line and skipping blank lines, up to
/// `max_files` entries. Migrated from `read_filenames` in buildindex.c.
pub fn read_filename_list(path: &Path, max_files: usize) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .take(max_files)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn reads_plain_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let data = read_input_file(&path, false, 1024).unwrap();
        assert_eq!(data, b"hello world");
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let err = read_input_file(&path, false, 10).unwrap_err();
        assert!(matches!(err, BuildError::Capacity { .. }));
    }

    #[test]
    fn reads_gzip_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed payload").unwrap();
        let compressed = encoder.finish().unwrap();
        std::fs::write(&path, compressed).unwrap();

        let data = read_input_file(&path, true, 1024).unwrap();
        assert_eq!(data, b"compressed payload");
    }

    #[test]
    fn filename_list_skips_blank_lines_and_trims() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "a.bin\n\nb.bin \nc.bin\n").unwrap();
        let names = read_filename_list(&path, 100).unwrap();
        assert_eq!(names, vec!["a.bin", "b.bin", "c.bin"]);
    }

    #[test]
    fn filename_list_respects_max_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "a.bin\nb.bin\nc.bin\n").unwrap();
        let names = read_filename_list(&path, 2).unwrap();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }
}
