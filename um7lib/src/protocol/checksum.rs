//! The frame checksum: a running sum of every byte before it.

/// Running byte sum, for encoding and decoding frames.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SumDigest(u32);

impl SumDigest {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = self.0.wrapping_add(*b as u32);
        }
    }

    /// Only the low 16 bits of the sum go on the wire.
    pub fn finalize(self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

/// Checksum a whole byte slice at once.
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut digest = SumDigest::new();
    digest.update(bytes);
    digest.finalize()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn preamble_only() {
        assert_eq!(checksum(b"snp\x00\x00"), 0x0151);
    }

    #[test]
    fn truncates_to_16_bits() {
        let data = [0xffu8; 300];
        assert_eq!(checksum(&data), ((300 * 0xff) & 0xffff) as u16);
    }

    #[test]
    fn incremental_matches_whole() {
        let mut digest = SumDigest::new();
        digest.update(b"sn");
        digest.update(b"p\x48\x03");
        assert_eq!(digest.finalize(), checksum(b"snp\x48\x03"));
    }
}
