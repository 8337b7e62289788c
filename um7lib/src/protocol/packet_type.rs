use crate::ProtocolError;

use super::{FRAME_OVERHEAD, MAX_BATCH_LENGTH};

const HAS_DATA: u8 = 1 << 7;
const IS_BATCH: u8 = 1 << 6;
const BATCH_SHIFT: u8 = 2;
const BATCH_MASK: u8 = 0x0f;
const HIDDEN: u8 = 1 << 1;
const COMMAND_FAILED: u8 = 1 << 0;

/// Build a raw type byte from its flags.
///
/// Fails if `data_length` does not fit in the 4-bit batch field.
pub fn construct_packet_type(
    has_data: bool,
    is_batch: bool,
    data_length: u8,
    hidden: bool,
    command_failed: bool,
) -> Result<u8, ProtocolError> {
    if data_length > MAX_BATCH_LENGTH {
        return Err(ProtocolError::InvalidArgument(
            "batch length must be at most 15",
        ));
    }

    let mut byte = data_length << BATCH_SHIFT;
    if has_data {
        byte |= HAS_DATA;
    }
    if is_batch {
        byte |= IS_BATCH;
    }
    if hidden {
        byte |= HIDDEN;
    }
    if command_failed {
        byte |= COMMAND_FAILED;
    }
    Ok(byte)
}

/// The type byte at offset 3 of every frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketType {
    pub has_data: bool,
    pub is_batch: bool,
    /// Number of registers in a batch, 0 to 15.
    pub batch_length: u8,
    pub hidden: bool,
    pub command_failed: bool,
}

impl PacketType {
    /// Request to read one register. The reply carries its data.
    pub fn read(hidden: bool) -> Self {
        Self {
            hidden,
            ..Self::default()
        }
    }

    /// Request to read `count` consecutive registers.
    pub fn batch_read(count: u8, hidden: bool) -> Self {
        Self {
            is_batch: true,
            batch_length: count,
            hidden,
            ..Self::default()
        }
    }

    /// Write carrying one register, or `count > 1` consecutive ones.
    pub fn write(count: u8, hidden: bool) -> Self {
        Self {
            has_data: true,
            is_batch: count > 1,
            batch_length: if count > 1 { count } else { 0 },
            hidden,
            command_failed: false,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            has_data: byte & HAS_DATA != 0,
            is_batch: byte & IS_BATCH != 0,
            batch_length: (byte >> BATCH_SHIFT) & BATCH_MASK,
            hidden: byte & HIDDEN != 0,
            command_failed: byte & COMMAND_FAILED != 0,
        }
    }

    pub fn to_byte(&self) -> Result<u8, ProtocolError> {
        construct_packet_type(
            self.has_data,
            self.is_batch,
            self.batch_length,
            self.hidden,
            self.command_failed,
        )
    }

    /// Payload bytes a frame of this type carries.
    pub fn payload_len(&self) -> usize {
        match (self.has_data, self.batch_length) {
            (false, _) => 0,
            (true, 0) => 4,
            (true, n) => 4 * n as usize,
        }
    }

    /// Total length of a frame with this type byte.
    pub fn frame_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload_len()
    }

    /// Payload bytes expected in the *reply* to a request of this type.
    pub fn reply_len(&self) -> usize {
        match (self.has_data, self.is_batch) {
            // writes are acknowledged without data
            (true, _) => FRAME_OVERHEAD,
            (false, true) => FRAME_OVERHEAD + 4 * self.batch_length as usize,
            (false, false) => FRAME_OVERHEAD + 4,
        }
    }
}
