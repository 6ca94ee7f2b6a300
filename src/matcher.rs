//! K-of-N 4-gram matcher.
//!
//! Migrated from `original_source/src/pymodule/malindexhelper.c`'s
//! `Cmatch_posting_lists`: open each queried n-gram's posting list, sort the
//! open handles by list size, then walk them in ascending size order with
//! an early-exit bound so lists past the point where even a perfect score
//! on every remaining n-gram couldn't reach `min_matches` are never opened.
//!
//! The counter array is owned by the [`Matcher`] and reused across calls
//! (reset between calls, not reallocated), mirroring the C extension's
//! module-global `counts` buffer sized once at `NUM_FIDS` and cleared with
//! `memset` at the start of every match.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::MatchError;
use crate::ngram;
use crate::tar_index::TarIndex;
use crate::varbyte;

/// Sentinel header-offset value, identical to the one used in `.postlist`
/// files (§3: "no posting list for this D").
const SENTINEL: u64 = u64::MAX;

/// Where a [`Matcher`] resolves posting lists from.
pub enum IndexSource {
    /// The unpacked `<root>/<AB_high>/<AB_low>/<C>.postlist[-gN]` layout.
    Dir {
        root: PathBuf,
        grouping_exponent: Option<u32>,
    },
    /// A tar-packed index plus its `.lookup` sidecar (§6).
    Tar(TarIndex),
}

impl IndexSource {
    pub fn dir(root: impl Into<PathBuf>, grouping_exponent: Option<u32>) -> Self {
        IndexSource::Dir { root: root.into(), grouping_exponent }
    }

    pub fn tar(tar_index: TarIndex) -> Self {
        IndexSource::Tar(tar_index)
    }

    /// Resolves one n-gram to an absolute byte offset in its backing file
    /// where that file's 256-entry `.postlist` header begins, opening the
    /// file along the way. Returns `None` if there is no list at all for
    /// this n-gram (missing directory entry, or a zero lookup value).
    fn open_header(&self, ngram: u32) -> std::io::Result<Option<(File, u64)>> {
        let prefix = ngram::prefix(ngram);
        let suffix = ngram::suffix(ngram);
        let c = ngram::suffix_high(suffix);
        match self {
            IndexSource::Dir { root, grouping_exponent } => {
                let path = crate::build::prefile::postlist_path(root, prefix, c, *grouping_exponent);
                if !path.exists() {
                    return Ok(None);
                }
                Ok(Some((File::open(path)?, 0)))
            }
            IndexSource::Tar(tar) => {
                let abc = ngram::abc_key(prefix, c);
                match tar.offset_for(abc) {
                    Some(offset) => Ok(Some((tar.open_handle()?, offset))),
                    None => Ok(None),
                }
            }
        }
    }
}

/// One n-gram's open, as-yet-unconsumed posting list: the file handle,
/// positioned so the next read yields the first (absolute) fid, and the
/// list's total entry count. Mirrors `triple_t` in malindexhelper.c.
struct Candidate {
    file: File,
    body_offset: u64,
    count: u64,
}

/// Opens `ngram`'s posting list within `source`, positioning at its first
/// entry. Returns `None` if the list is absent or empty. Corresponds to the
/// per-n-gram setup loop in `Cmatch_posting_lists` (lookup + header-offset
/// seek + count read).
fn open_candidate(source: &IndexSource, ngram: u32) -> std::io::Result<Option<Candidate>> {
    let (mut file, header_start) = match source.open_header(ngram)? {
        Some(pair) => pair,
        None => return Ok(None),
    };
    let d = ngram::suffix_low(ngram::suffix(ngram));
    file.seek(SeekFrom::Start(header_start + 8 * d as u64))?;
    let mut entry_bytes = [0u8; 8];
    file.read_exact(&mut entry_bytes)?;
    let entry_offset = u64::from_le_bytes(entry_bytes);
    if entry_offset == SENTINEL {
        return Ok(None);
    }
    file.seek(SeekFrom::Start(header_start + 256 * 8 + entry_offset))?;
    let mut count_bytes = [0u8; 8];
    file.read_exact(&mut count_bytes)?;
    let count = u64::from_le_bytes(count_bytes);
    if count == 0 {
        return Ok(None);
    }
    let body_offset = header_start + 256 * 8 + entry_offset + 8;
    Ok(Some(Candidate { file, body_offset, count }))
}

/// Owns a reusable per-fid match counter array and runs K-of-N queries
/// against an [`IndexSource`]. Not `Sync`: callers running matches
/// concurrently must allocate one `Matcher` per thread (§5).
pub struct Matcher {
    counters: Vec<u16>,
}

impl Matcher {
    /// Allocates a zeroed counter array sized for fids in `[0, n_fids)`.
    pub fn new(n_fids: u32) -> Matcher {
        Matcher { counters: vec![0u16; n_fids as usize] }
    }

    /// Re-zeroes the counter array for reuse across calls (§4.7 precondition).
    pub fn reset(&mut self) {
        self.counters.iter_mut().for_each(|c| *c = 0);
    }

    /// Runs one K-of-N query: returns every fid present in at least
    /// `min_matches` of `ngrams`'s posting lists. Calls [`Matcher::reset`]
    /// first, so the same `Matcher` may be reused call after call.
    ///
    /// Corresponds to `Cmatch_posting_lists`: per-ngram open + size sort +
    /// early-exit bounded scan + counter increment with exactly-once result
    /// insertion at the moment a counter reaches `min_matches`.
    pub fn match_ngrams(
        &mut self,
        source: &IndexSource,
        ngrams: &[u32],
        min_matches: u32,
    ) -> Result<HashSet<u32>, MatchError> {
        if ngrams.len() > u16::MAX as usize {
            return Err(MatchError::TooManyNgrams);
        }
        self.reset();

        let mut candidates: Vec<Option<Candidate>> = Vec::with_capacity(ngrams.len());
        let mut nonempty = 0usize;
        for &ngram in ngrams {
            let candidate = open_candidate(source, ngram).map_err(|_| MatchError::ResultAlloc)?;
            if candidate.is_some() {
                nonempty += 1;
            }
            candidates.push(candidate);
        }

        // Early exit: fewer non-empty lists than the threshold can never
        // reach it regardless of overlap.
        if nonempty < min_matches as usize {
            return Ok(HashSet::new());
        }

        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&i| match &candidates[i] {
            Some(c) => c.count,
            None => u64::MAX,
        });

        let mut result = HashSet::new();
        let mut maxseen: u32 = 0;
        let n = order.len() as u32;

        for (i, &idx) in order.iter().enumerate() {
            if maxseen + (n - i as u32) < min_matches {
                break;
            }
            let candidate = match &mut candidates[idx] {
                Some(c) => c,
                None => continue,
            };
            self.stream_candidate(candidate, min_matches, &mut maxseen, &mut result)
                .map_err(|_| MatchError::ResultAlloc)?;
        }

        Ok(result)
    }

    fn stream_candidate(
        &mut self,
        candidate: &mut Candidate,
        min_matches: u32,
        maxseen: &mut u32,
        result: &mut HashSet<u32>,
    ) -> std::io::Result<()> {
        candidate.file.seek(SeekFrom::Start(candidate.body_offset))?;
        let mut first_bytes = [0u8; 4];
        candidate.file.read_exact(&mut first_bytes)?;
        let mut fid = u32::from_le_bytes(first_bytes);
        self.bump(fid, min_matches, maxseen, result);

        for _ in 1..candidate.count {
            let delta = varbyte::decode_from(&mut candidate.file)?;
            fid = fid.wrapping_add(delta);
            self.bump(fid, min_matches, maxseen, result);
        }
        Ok(())
    }

    #[inline]
    fn bump(&mut self, fid: u32, min_matches: u32, maxseen: &mut u32, result: &mut HashSet<u32>) {
        if (fid as usize) >= self.counters.len() {
            return;
        }
        let c = &mut self.counters[fid as usize];
        *c += 1;
        if (*c as u32) > *maxseen {
            *maxseen = *c as u32;
        }
        if *c as u32 == min_matches {
            result.insert(fid);
        }
    }
}
