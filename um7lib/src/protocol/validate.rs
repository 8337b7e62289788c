use crate::{ProtocolError, StructuralError};

use super::{checksum, Frame, FRAME_OVERHEAD};

/// Does the trailing checksum match the sum of everything before it?
pub fn verify_checksum(frame: &Frame) -> bool {
    match frame.received_checksum() {
        Some(received) => checksum::checksum(frame.body()) == received,
        None => false,
    }
}

/// Check the frame length against its type byte, and the command
/// failed flag.
pub fn check_structure(frame: &Frame) -> Result<(), StructuralError> {
    let len = frame.len();
    if len < FRAME_OVERHEAD {
        return Err(StructuralError::TooShort { len });
    }

    let typ = frame.packet_type();
    if typ.command_failed {
        return Err(StructuralError::CommandFailed {
            address: frame.address(),
        });
    }

    let expected = typ.frame_len();
    if len == expected {
        return Ok(());
    }

    Err(match (typ.has_data, typ.batch_length) {
        (false, _) => StructuralError::NoDataLength { len },
        (true, 0) => StructuralError::SingleLength { len },
        (true, batch_length) => StructuralError::BatchLength {
            batch_length,
            expected,
            len,
        },
    })
}

/// Like [check_structure], but logs the violation instead of returning it.
pub fn validate_structure(frame: &Frame) -> bool {
    match check_structure(frame) {
        Ok(()) => true,
        Err(e) => {
            log::error!("invalid frame: {}", e);
            false
        }
    }
}

/// Get the payload of a frame, if the checksum is good.
pub fn extract_payload<'a>(frame: &Frame<'a>) -> Result<&'a [u8], ProtocolError> {
    let received = frame.received_checksum().unwrap_or(0);
    let calculated = checksum::checksum(frame.body());
    if frame.len() < FRAME_OVERHEAD || calculated != received {
        return Err(ProtocolError::Checksum {
            calculated,
            received,
        });
    }
    Ok(frame.raw_payload())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::build_request_frame;

    fn health_frame() -> Vec<u8> {
        build_request_frame(0x80, 0x55, &[0x12, 0x34, 0x56, 0x78])
    }

    #[test]
    fn checksum_good() {
        let data = health_frame();
        assert!(verify_checksum(&Frame::new(&data)));
    }

    #[test]
    fn checksum_bad() {
        let mut data = health_frame();
        data[6] ^= 0x01;
        assert!(!verify_checksum(&Frame::new(&data)));
    }

    #[test]
    fn checksum_short() {
        assert!(!verify_checksum(&Frame::new(b"snp\x00")));
    }

    #[test]
    fn structure_single() {
        let data = health_frame();
        assert_eq!(check_structure(&Frame::new(&data)), Ok(()));
    }

    #[test]
    fn structure_no_data_wrong_length() {
        let data = build_request_frame(0x00, 0x55, &[0, 0, 0, 0]);
        assert_eq!(
            check_structure(&Frame::new(&data)),
            Err(StructuralError::NoDataLength { len: 11 })
        );
        assert!(!validate_structure(&Frame::new(&data)));
    }

    #[test]
    fn structure_batch_wrong_length() {
        // declares 3 registers, carries 2
        let data = build_request_frame(0xcc, 0x61, &[0; 8]);
        assert_eq!(
            check_structure(&Frame::new(&data)),
            Err(StructuralError::BatchLength {
                batch_length: 3,
                expected: 19,
                len: 15,
            })
        );
    }

    #[test]
    fn structure_command_failed() {
        let data = build_request_frame(0x01, 0xad, &[]);
        assert_eq!(
            check_structure(&Frame::new(&data)),
            Err(StructuralError::CommandFailed { address: 0xad })
        );
    }

    #[test]
    fn payload_extracted() {
        let data = health_frame();
        assert_eq!(
            extract_payload(&Frame::new(&data)),
            Ok([0x12, 0x34, 0x56, 0x78].as_ref())
        );
    }

    #[test]
    fn payload_bad_checksum() {
        let mut data = health_frame();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        assert!(matches!(
            extract_payload(&Frame::new(&data)),
            Err(ProtocolError::Checksum { .. })
        ));
    }

    #[quickcheck_macros::quickcheck]
    fn payload_iff_checksum(data: Vec<u8>) -> bool {
        let frame = Frame::new(&data);
        extract_payload(&frame).is_ok() == verify_checksum(&frame)
    }
}
