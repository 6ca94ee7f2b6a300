//! End-to-end: packing an index into a single tar file plus `.lookup`
//! sidecar, then matching through the tar-mode source, yields the same
//! results as matching the unpacked directory directly.

use std::collections::HashSet;

use ngram4::tar_index::{pack, TarIndex};
use ngram4::{run_all, BuildConfig, IndexSource, Matcher};

fn write_corpus(dir: &std::path::Path, files: &[(&str, &[u8])]) -> std::path::PathBuf {
    let list_path = dir.join("list.txt");
    let mut list = String::new();
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        list.push_str(&format!("{}\n", path.display()));
    }
    std::fs::write(&list_path, list).unwrap();
    list_path
}

#[test]
fn packed_tar_index_matches_unpacked_directory() {
    let dir = tempfile::tempdir().unwrap();
    let a = [0x01, 0x02, 0x03, 0x04];
    let b = [0x05, 0x06, 0x07, 0x08];
    let mut f1 = a.to_vec();
    f1.extend_from_slice(&b);

    let list_path = write_corpus(dir.path(), &[("f0", &a), ("f1", &f1), ("f2", &b)]);

    let unpacked = dir.path().join("idx");
    let mut cfg = BuildConfig::new(list_path, unpacked.clone());
    cfg.w_read = 2;
    cfg.w_ng = 2;
    cfg.num_stage2_workers = 2;
    run_all(&cfg).unwrap();

    let packed_base = dir.path().join("packed");
    pack(&unpacked, &packed_base).unwrap();

    let dir_source = IndexSource::dir(unpacked, None);
    let tar_index = TarIndex::open(&packed_base).unwrap();
    let tar_source = IndexSource::tar(tar_index);

    let ngram_a = u32::from_be_bytes(a);
    let ngram_b = u32::from_be_bytes(b);

    let mut matcher = Matcher::new(16);
    let dir_result: HashSet<u32> = matcher.match_ngrams(&dir_source, &[ngram_a, ngram_b], 1).unwrap();
    let tar_result: HashSet<u32> = matcher.match_ngrams(&tar_source, &[ngram_a, ngram_b], 1).unwrap();

    assert_eq!(dir_result, tar_result);
    assert_eq!(dir_result, HashSet::from([0, 1, 2]));

    let dir_result2 = matcher.match_ngrams(&dir_source, &[ngram_a, ngram_b], 2).unwrap();
    let tar_result2 = matcher.match_ngrams(&tar_source, &[ngram_a, ngram_b], 2).unwrap();
    assert_eq!(dir_result2, tar_result2);
    assert_eq!(dir_result2, HashSet::from([1]));
}

#[test]
fn empty_index_packs_to_all_sentinel_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("empty");
    std::fs::create_dir_all(&root).unwrap();
    let packed_base = dir.path().join("packed_empty");
    pack(&root, &packed_base).unwrap();

    let tar_index = TarIndex::open(&packed_base).unwrap();
    let source = IndexSource::tar(tar_index);
    let mut matcher = Matcher::new(4);
    let result = matcher.match_ngrams(&source, &[0x0102_0304u32], 1).unwrap();
    assert!(result.is_empty());
}
