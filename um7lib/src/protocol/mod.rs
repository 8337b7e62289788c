pub const PREAMBLE: [u8; 3] = *b"snp";

/// Preamble, type byte, address byte, and checksum.
pub const FRAME_OVERHEAD: usize = PREAMBLE.len() + 2 + 2;

/// A full batch of 15 registers.
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + 4 * MAX_BATCH_LENGTH as usize;

pub const MAX_BATCH_LENGTH: u8 = 15;

pub const BAUD_RATE: u32 = 115200;

pub mod checksum;

mod frame;
pub use frame::Frame;

mod packet_type;
pub use packet_type::*;

pub mod parse;
pub use parse::{extract_next_frame, find_frame, preamble_start};

pub mod serialize;
pub use serialize::build_request_frame;

mod telemetry;
pub use telemetry::*;

mod validate;
pub use validate::*;
