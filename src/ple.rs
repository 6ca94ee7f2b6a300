//! Posting-list entry (PLE) — the intermediate unit stored in prefiles
//! between stage 1 and stage 2.
//!
//! The original lays this out as a packed C struct (`uint16_t ngram_suffix,
//! uint32_t fid`, 6 bytes total). Per spec.md's "raw binary structs" note,
//! this crate serializes the two fields explicitly rather than relying on a
//! packed-repr struct, pinning little-endian for both.

pub const PLE_WIRE_SIZE: usize = 6;

/// One (suffix, fid) pair. `suffix` is the concatenation CD of the 4-gram
/// that produced this entry; `fid` is the producing file's identifier
/// (already grouped, if grouping is active).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ple {
    pub suffix: u16,
    pub fid: u32,
}

impl Ple {
    pub fn new(suffix: u16, fid: u32) -> Self {
        Ple { suffix, fid }
    }

    /// High byte of `suffix` (selects the posting-list file).
    #[inline]
    pub fn c(&self) -> u8 {
        (self.suffix >> 8) as u8
    }

    /// Low byte of `suffix` (selects the list within the file).
    #[inline]
    pub fn d(&self) -> u8 {
        (self.suffix & 0xFF) as u8
    }

    /// The `(suffix, fid)` sort key used by stage 2 to order a prefile's
    /// entries before deduplication. `fid` here is expected to already be
    /// the grouped gid when grouping is active.
    #[inline]
    pub fn sort_key(&self) -> (u16, u32) {
        (self.suffix, self.fid)
    }

    /// Serializes to the 6-byte little-endian wire form.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.suffix.to_le_bytes());
        out.extend_from_slice(&self.fid.to_le_bytes());
    }

    /// Parses one entry from `bytes[pos..pos+6]`.
    pub fn read_from(bytes: &[u8], pos: usize) -> Ple {
        let suffix = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        let fid = u32::from_le_bytes([
            bytes[pos + 2],
            bytes[pos + 3],
            bytes[pos + 4],
            bytes[pos + 5],
        ]);
        Ple { suffix, fid }
    }
}

/// Parses every PLE out of a buffer whose length is a multiple of
/// `PLE_WIRE_SIZE`, as produced by reading a whole prefile into memory.
pub fn read_all(bytes: &[u8]) -> Vec<Ple> {
    debug_assert_eq!(bytes.len() % PLE_WIRE_SIZE, 0);
    bytes
        .chunks_exact(PLE_WIRE_SIZE)
        .map(|chunk| Ple::read_from(chunk, 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let ple = Ple::new(0x4344, 0x0102_0304);
        let mut buf = Vec::new();
        ple.write_to(&mut buf);
        assert_eq!(buf.len(), PLE_WIRE_SIZE);
        let parsed = Ple::read_from(&buf, 0);
        assert_eq!(parsed, ple);
    }

    #[test]
    fn c_and_d_split_suffix() {
        let ple = Ple::new(0x4344, 0);
        assert_eq!(ple.c(), 0x43);
        assert_eq!(ple.d(), 0x44);
    }

    #[test]
    fn sort_key_orders_by_suffix_then_fid() {
        let mut entries = vec![
            Ple::new(2, 5),
            Ple::new(1, 9),
            Ple::new(1, 3),
            Ple::new(2, 1),
        ];
        entries.sort_by_key(|p| p.sort_key());
        assert_eq!(
            entries,
            vec![Ple::new(1, 3), Ple::new(1, 9), Ple::new(2, 1), Ple::new(2, 5)]
        );
    }

    #[test]
    fn read_all_parses_concatenated_entries() {
        let mut buf = Vec::new();
        Ple::new(1, 2).write_to(&mut buf);
        Ple::new(3, 4).write_to(&mut buf);
        let parsed = read_all(&buf);
        assert_eq!(parsed, vec![Ple::new(1, 2), Ple::new(3, 4)]);
    }
}
