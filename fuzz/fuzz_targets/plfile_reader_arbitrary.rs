#![no_main]

use libfuzzer_sys::fuzz_target;
use ngram4::plfile::PlFileReader;
use std::io::Write;

// Arbitrary bytes, fed to the reader as a `.postlist` file on disk, must
// never panic -- either it parses (and streaming never decodes past the
// declared count) or the reader surfaces an `io::Error`.
fuzz_target!(|data: &[u8]| {
    let dir = std::env::temp_dir().join(format!("ngram4-fuzz-{}", std::process::id()));
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join("fuzz.postlist");
    if let Ok(mut f) = std::fs::File::create(&path) {
        let _ = f.write_all(data);
    }

    if let Ok(mut reader) = PlFileReader::open(&path) {
        for d in 0u16..=255 {
            let d = d as u8;
            if reader.seek_to(d).is_err() {
                continue;
            }
            let mut guard = 0;
            while reader.has_next() && guard < 10_000 {
                match reader.next() {
                    Ok(_) => {}
                    Err(_) => break,
                }
                guard += 1;
            }
        }
    }

    let _ = std::fs::remove_file(&path);
});
