use super::{PacketType, FRAME_OVERHEAD, PREAMBLE};

/// A view over one candidate frame, starting at its preamble.
///
/// Nothing is checked on construction. Accessors that would read past
/// the end of a short frame return defaults instead, so use
/// [validate_structure][super::validate_structure] and
/// [verify_checksum][super::verify_checksum] before trusting the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn has_preamble(&self) -> bool {
        self.bytes.starts_with(&PREAMBLE)
    }

    pub fn type_byte(&self) -> u8 {
        self.bytes.get(3).copied().unwrap_or(0)
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType::from_byte(self.type_byte())
    }

    pub fn address(&self) -> u8 {
        self.bytes.get(4).copied().unwrap_or(0)
    }

    /// Payload bytes between the address and the checksum, unchecked.
    pub fn raw_payload(&self) -> &'a [u8] {
        if self.bytes.len() < FRAME_OVERHEAD {
            return &[];
        }
        &self.bytes[5..self.bytes.len() - 2]
    }

    /// Everything the checksum covers.
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len().saturating_sub(2)]
    }

    /// The big-endian checksum carried in the last two bytes.
    pub fn received_checksum(&self) -> Option<u16> {
        match self.bytes {
            [.., hi, lo] if self.bytes.len() >= FRAME_OVERHEAD => {
                Some(u16::from_be_bytes([*hi, *lo]))
            }
            _ => None,
        }
    }
}

impl<'a> AsRef<[u8]> for Frame<'a> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}
