//! Grouping — the optional `fid -> gid` modular projection.
//!
//! Migrated from the `GROUP` macro in buildindex.h:
//! `GROUP(fid, D) = grouping ? fid % P[g][D % n_primes] : fid`.
//!
//! The original's `LIST_OF_PRIMES` table is not part of the distilled
//! material this crate was built from (see DESIGN.md). Rather than guess its
//! contents, each exponent's row is synthesized once, on first use, as the
//! `GROUPING_PRIMES_PER_EXPONENT` largest odd primes below `2^g`, and cached
//! for the process lifetime. This preserves the documented semantics (a
//! per-`(g, D mod n_primes)` modulus bounding the false-positive rate) without
//! claiming bit-compatibility with the original tool's grouped output.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::GROUPING_PRIMES_PER_EXPONENT;

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Finds the `count` largest odd primes strictly below `2^exponent`,
/// returned in descending order.
fn primes_below(exponent: u32, count: usize) -> Vec<u64> {
    let limit: u64 = 1u64 << exponent;
    let mut found = Vec::with_capacity(count);
    let mut candidate = if limit % 2 == 0 { limit - 1 } else { limit - 2 };
    while found.len() < count && candidate >= 3 {
        if is_prime(candidate) {
            found.push(candidate);
        }
        candidate -= 2;
    }
    // exponent too small to yield `count` distinct primes below 2^exponent:
    // fall back to padding with the smallest prime found so GROUP never
    // divides by a value it hasn't computed.
    while found.len() < count {
        found.push(*found.last().unwrap_or(&3));
    }
    found
}

/// A cached, per-exponent row of primes, used to evaluate `GROUP`.
pub struct GroupTable {
    row: Vec<u64>,
}

impl GroupTable {
    /// Builds (or fetches from cache) the prime row for grouping exponent `g`.
    pub fn for_exponent(g: u32) -> GroupTable {
        static CACHE: Mutex<Option<HashMap<u32, Vec<u64>>>> = Mutex::new(None);
        let mut guard = CACHE.lock().unwrap();
        let map = guard.get_or_insert_with(HashMap::new);
        let row = map
            .entry(g)
            .or_insert_with(|| primes_below(g, GROUPING_PRIMES_PER_EXPONENT))
            .clone();
        GroupTable { row }
    }

    /// Evaluates `fid mod P[g][d as usize % n_primes]`.
    pub fn group(&self, fid: u32, d: u8) -> u32 {
        let modulus = self.row[(d as usize) % self.row.len()];
        ((fid as u64) % modulus) as u32
    }
}

/// Applies the grouping transform if `table` is `Some`, else returns `fid`
/// unchanged (the `use_grouping` branch of the original `GROUP` macro).
#[inline]
pub fn group(fid: u32, d: u8, table: Option<&GroupTable>) -> u32 {
    match table {
        Some(t) => t.group(fid, d),
        None => fid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_grouping() {
        assert_eq!(group(12345, 7, None), 12345);
    }

    #[test]
    fn grouped_value_is_bounded_by_modulus() {
        let table = GroupTable::for_exponent(10);
        for d in 0..=255u8 {
            let g = table.group(u32::MAX, d);
            let modulus = table.row[(d as usize) % table.row.len()];
            assert!((g as u64) < modulus);
        }
    }

    #[test]
    fn table_is_cached_and_stable_across_calls() {
        let a = GroupTable::for_exponent(12);
        let b = GroupTable::for_exponent(12);
        assert_eq!(a.row, b.row);
    }

    #[test]
    fn primes_below_are_actually_prime_and_below_bound() {
        let row = primes_below(16, 32);
        let bound = 1u64 << 16;
        for &p in &row {
            assert!(p < bound);
            assert!(is_prime(p));
        }
    }

    #[test]
    fn rejects_trivial_even_numbers() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(!is_prime(4));
    }
}
