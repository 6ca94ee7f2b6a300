//! End-to-end: merging indices built separately over disjoint file sets
//! must match the behavior of a single index built over their union, up to
//! the documented fid-rebasing by shift.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;

use ngram4::merge::{MergeConfig, MergeInput};
use ngram4::{run_all, run_merge, BuildConfig, IndexSource, Matcher};

fn write_list(dir: &std::path::Path, name: &str, files: &[(&str, &[u8])]) -> std::path::PathBuf {
    let list_path = dir.join(name);
    let mut list = String::new();
    for (fname, content) in files {
        let path = dir.join(fname);
        std::fs::write(&path, content).unwrap();
        list.push_str(&format!("{}\n", path.display()));
    }
    std::fs::write(&list_path, list).unwrap();
    list_path
}

fn build(dir: &std::path::Path, name: &str, files: &[(&str, &[u8])]) -> std::path::PathBuf {
    let list_path = write_list(dir, name, files);
    let out = dir.join(format!("{name}_out"));
    let mut cfg = BuildConfig::new(list_path, out.clone());
    cfg.w_read = 2;
    cfg.w_ng = 2;
    cfg.num_stage2_workers = 2;
    run_all(&cfg).unwrap();
    out
}

#[test]
fn merged_index_matches_union_build_under_fid_rebasing() {
    let dir = tempfile::tempdir().unwrap();
    let f0: Vec<u8> = vec![0x01, 0x02, 0x03, 0x04];
    let f1: Vec<u8> = vec![0x05, 0x06, 0x07, 0x08];
    let f2: Vec<u8> = vec![0x01, 0x02, 0x03, 0x04]; // shares f0's ngram
    let f3: Vec<u8> = vec![0x09, 0x0a, 0x0b, 0x0c];

    // Index X over [f0, f1] (size 2), index Y over [f2, f3] (size 2).
    let out_x = build(dir.path(), "x", &[("f0", &f0), ("f1", &f1)]);
    let out_y = build(dir.path(), "y", &[("f2", &f2), ("f3", &f3)]);

    // Reference: a single build over the union in the same order.
    let out_union = build(
        dir.path(),
        "union",
        &[("u0", &f0), ("u1", &f1), ("u2", &f2), ("u3", &f3)],
    );

    let merged_out = dir.path().join("merged");
    std::fs::create_dir_all(&merged_out).unwrap();
    let cfg = MergeConfig {
        out_dir: merged_out.clone(),
        inputs: vec![
            MergeInput { dir: out_x, size: 2 },
            MergeInput { dir: out_y, size: 2 },
        ],
    };
    let cancel = AtomicBool::new(false);
    run_merge(&cfg, 0, 1 << 24, &cancel).unwrap();

    let shared_ngram = u32::from_be_bytes([0x01, 0x02, 0x03, 0x04]);

    let merged_source = IndexSource::dir(merged_out, None);
    let union_source = IndexSource::dir(out_union, None);
    let mut matcher = Matcher::new(16);

    let merged_result: HashSet<u32> = matcher.match_ngrams(&merged_source, &[shared_ngram], 1).unwrap();
    let union_result: HashSet<u32> = matcher.match_ngrams(&union_source, &[shared_ngram], 1).unwrap();

    // Index Y's local fid 0 (f2) is rebased by shift[1] = size_x = 2, so it
    // lands at merged fid 2, exactly matching the union build's fid for u2.
    assert_eq!(merged_result, HashSet::from([0, 2]));
    assert_eq!(merged_result, union_result);
}

#[test]
fn three_way_merge_preserves_ascending_order() {
    let dir = tempfile::tempdir().unwrap();
    let ngram_bytes = [0xAA, 0xBB, 0xCC, 0xDD];

    let out_a = build(dir.path(), "a", &[("a0", &ngram_bytes)]);
    let out_b = build(dir.path(), "b", &[("b0", &ngram_bytes)]);
    let out_c = build(dir.path(), "c", &[("c0", &ngram_bytes)]);

    let merged_out = dir.path().join("merged3");
    std::fs::create_dir_all(&merged_out).unwrap();
    let cfg = MergeConfig {
        out_dir: merged_out.clone(),
        inputs: vec![
            MergeInput { dir: out_a, size: 1 },
            MergeInput { dir: out_b, size: 1 },
            MergeInput { dir: out_c, size: 1 },
        ],
    };
    let cancel = AtomicBool::new(false);
    run_merge(&cfg, 0, 1 << 24, &cancel).unwrap();

    let ngram = u32::from_be_bytes(ngram_bytes);
    let source = IndexSource::dir(merged_out, None);
    let mut matcher = Matcher::new(16);
    let result = matcher.match_ngrams(&source, &[ngram], 1).unwrap();
    assert_eq!(result, HashSet::from([0, 1, 2]));
}
