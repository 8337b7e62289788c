use crate::registers::Access;

/// Ways a frame can be well-formed on the wire but still unusable.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructuralError {
    #[error("frame is {len} bytes, shorter than the minimum of 7")]
    TooShort { len: usize },
    #[error("device reported command failure for address {address:#04x}")]
    CommandFailed { address: u8 },
    #[error("frame without data must be 7 bytes, got {len}")]
    NoDataLength { len: usize },
    #[error("single register frame must be 11 bytes, got {len}")]
    SingleLength { len: usize },
    #[error("batch of {batch_length} registers must be {expected} bytes, got {len}")]
    BatchLength {
        batch_length: u8,
        expected: usize,
        len: usize,
    },
}

/// Errors from building, validating, or decoding frames.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtocolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("checksum mismatch: calculated {calculated:#06x}, received {received:#06x}")]
    Checksum { calculated: u16, received: u16 },
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("unrecognized frame: address {address:#04x}, length {len}")]
    UnrecognizedFrame { address: u8, len: usize },
    #[error("payload for address {address:#04x} did not decode")]
    Payload { address: u8 },
}

/// An error type for [Client][crate::Client].
#[derive(thiserror::Error, Debug)]
pub enum ClientError<E> {
    /// EOF in underlying stream.
    #[error("unexpected eof")]
    UnexpectedEof,
    /// Other IO error in underlying stream.
    #[error("io error: {0:?}")]
    Io(E),
    /// No matching response arrived in the retry window.
    #[error("no response from address {address:#04x} after {attempts} attempt(s)")]
    Timeout { address: u8, attempts: u32 },
    /// The register does not allow the attempted access.
    #[error("register {name} is {access}")]
    RegisterAccess { name: &'static str, access: Access },
    /// No register by that name in the directory.
    #[error("unknown register: {0}")]
    UnknownRegister(String),
    /// The device answered with the command failed bit set.
    #[error("command at address {address:#04x} failed")]
    CommandFailed { address: u8 },
    /// Frame building or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),
}

impl<E> From<E> for ClientError<E> {
    fn from(other: E) -> Self {
        Self::Io(other)
    }
}

impl<E> ClientError<E> {
    /// Wrap a [ProtocolError].
    pub fn protocol(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}
