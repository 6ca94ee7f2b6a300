//! End-to-end: build a small corpus into an index, then query it with the
//! matcher. Exercises the full stage-1 -> stage-2 -> match path through the
//! public library API, the way a host embedding this crate would.

use std::collections::HashSet;

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
fn build_then_match_k_of_n() {
    let dir = tempfile::tempdir().unwrap();
    let a = [0x01, 0x02, 0x03, 0x04];
    let b = [0x05, 0x06, 0x07, 0x08];
    let c = [0x09, 0x0a, 0x0b, 0x0c];

    let mut f1 = a.to_vec();
    f1.extend_from_slice(&b);
    let mut f2 = a.to_vec();
    f2.extend_from_slice(&b);
    f2.extend_from_slice(&c);

    let list_path = write_corpus(
        dir.path(),
        &[("f0", &a), ("f1", &f1), ("f2", &f2), ("f3", &b)],
    );

    let out = dir.path().join("idx");
    let mut cfg = BuildConfig::new(list_path, out.clone());
    cfg.w_read = 2;
    cfg.w_ng = 4;
    cfg.num_stage2_workers = 2;
    run_all(&cfg).unwrap();

    let source = IndexSource::dir(out, None);
    let mut matcher = Matcher::new(16);
    let ngram_a = u32::from_be_bytes(a);
    let ngram_b = u32::from_be_bytes(b);
    let ngram_c = u32::from_be_bytes(c);

    let result = matcher
        .match_ngrams(&source, &[ngram_a, ngram_b, ngram_c], 2)
        .unwrap();
    assert_eq!(result, HashSet::from([1, 2]));

    let result = matcher
        .match_ngrams(&source, &[ngram_a, ngram_b, ngram_c], 3)
        .unwrap();
    assert_eq!(result, HashSet::from([2]));
}

#[test]
fn zero_byte_filter_excludes_matching_ngrams_from_query() {
    let dir = tempfile::tempdir().unwrap();
    let list_path = write_corpus(dir.path(), &[("f0", &[0x00, 0x01, 0x02, 0x03])]);

    let out = dir.path().join("idx");
    let mut cfg = BuildConfig::new(list_path, out.clone());
    cfg.w_read = 1;
    cfg.w_ng = 1;
    cfg.num_stage2_workers = 1;
    cfg.omit_zero_bytes = true;
    run_all(&cfg).unwrap();

    let source = IndexSource::dir(out, None);
    let mut matcher = Matcher::new(4);
    let ngram = u32::from_be_bytes([0x00, 0x01, 0x02, 0x03]);
    let result = matcher.match_ngrams(&source, &[ngram], 1).unwrap();
    assert!(result.is_empty());
}

#[test]
fn grouping_returns_superset_of_exact_result() {
    let dir = tempfile::tempdir().unwrap();
    let a = [0x11, 0x22, 0x33, 0x44];
    // 50 files, half containing the n-gram, half not, so grouping collisions
    // are plausible within a small modulus.
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..50u8 {
        let data = if i % 2 == 0 { a.to_vec() } else { vec![i, i.wrapping_add(1), i.wrapping_add(2), i.wrapping_add(3)] };
        files.push((format!("f{i}"), data));
    }
    let file_refs: Vec<(&str, &[u8])> = files.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
    let list_path = write_corpus(dir.path(), &file_refs);

    let exact_out = dir.path().join("exact");
    let mut exact_cfg = BuildConfig::new(list_path.clone(), exact_out.clone());
    exact_cfg.w_read = 2;
    exact_cfg.w_ng = 2;
    exact_cfg.num_stage2_workers = 2;
    run_all(&exact_cfg).unwrap();

    let grouped_out = dir.path().join("grouped");
    let mut grouped_cfg = BuildConfig::new(list_path, grouped_out.clone());
    grouped_cfg.w_read = 2;
    grouped_cfg.w_ng = 2;
    grouped_cfg.num_stage2_workers = 2;
    grouped_cfg.grouping_exponent = Some(8);
    run_all(&grouped_cfg).unwrap();

    let ngram = u32::from_be_bytes(a);
    let exact_source = IndexSource::dir(exact_out, None);
    let grouped_source = IndexSource::dir(grouped_out, Some(8));

    let mut matcher = Matcher::new(64);
    let exact = matcher.match_ngrams(&exact_source, &[ngram], 1).unwrap();
    let grouped_gids = matcher.match_ngrams(&grouped_source, &[ngram], 1).unwrap();

    // Every exact fid, reduced by the same grouping function, must appear in
    // the grouped result (superset property, §8 "Grouping specialization").
    let table = ngram4::grouping::GroupTable::for_exponent(8);
    let d = ngram4::ngram::suffix_low(ngram4::ngram::suffix(ngram));
    for &fid in &exact {
        let gid = ngram4::grouping::group(fid, d, Some(&table));
        assert!(grouped_gids.contains(&gid));
    }
}
