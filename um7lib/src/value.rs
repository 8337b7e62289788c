use crate::ProtocolError;

/// A value to write to a register.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum RegisterValue {
    /// Sent as a 4-byte big-endian integer.
    U32(u32),
    /// Sent as a big-endian IEEE-754 single.
    F32(f32),
    /// Sent verbatim, one or more whole registers.
    Bytes(Vec<u8>),
}

impl RegisterValue {
    /// Encode the payload for a write frame.
    pub fn to_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::U32(v) => Ok(v.to_be_bytes().to_vec()),
            Self::F32(v) => Ok(v.to_be_bytes().to_vec()),
            Self::Bytes(b) => {
                if b.is_empty() || b.len() % 4 != 0 {
                    return Err(ProtocolError::InvalidArgument(
                        "register data must be a whole number of 4-byte registers",
                    ));
                }
                Ok(b.clone())
            }
        }
    }

    /// How many consecutive registers this value covers.
    pub fn register_count(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len() / 4,
            _ => 1,
        }
    }
}

impl From<u32> for RegisterValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i32> for RegisterValue {
    fn from(v: i32) -> Self {
        Self::U32(v as u32)
    }
}

impl From<f32> for RegisterValue {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<Vec<u8>> for RegisterValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for RegisterValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<[u8; 4]> for RegisterValue {
    fn from(v: [u8; 4]) -> Self {
        Self::Bytes(v.to_vec())
    }
}
