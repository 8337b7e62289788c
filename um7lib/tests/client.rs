mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{client, echo_device, euler, frame, health, MockPort};
use um7lib::protocol::Frame;
use um7lib::registers::{Access, FieldValue};
use um7lib::{ClientError, ProtocolError, RetryPolicy};

#[test]
fn read_register() {
    let mut client = client(MockPort::with_responder(echo_device([0x50, 0, 0, 0])));

    assert_eq!(client.read_register(0x00, false).unwrap(), [0x50, 0, 0, 0]);
    assert_eq!(
        client.port().written,
        [0x73, 0x6e, 0x70, 0x00, 0x00, 0x01, 0x51]
    );
    assert_eq!(client.stats().retries, 0);
}

#[test]
fn read_skips_interleaved_broadcasts() {
    let mut client = client(MockPort::with_responder(|request: &[u8]| {
        let address = Frame::new(request).address();
        vec![
            health(0),
            euler(1, 2, 3),
            frame(0x80, address, &[1, 2, 3, 4]),
            health(1),
        ]
    }));

    assert_eq!(client.read_register(0x01, false).unwrap(), [1, 2, 3, 4]);
    assert_eq!(client.stats().discarded, 2);
}

#[test]
fn read_retries_after_lost_response() {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let mut client = client(MockPort::with_responder(move |request: &[u8]| {
        seen.set(seen.get() + 1);
        if seen.get() == 1 {
            return vec![];
        }
        vec![frame(0x80, Frame::new(request).address(), &[0, 0, 0, 9])]
    }));

    assert_eq!(client.read_register(0x02, false).unwrap(), [0, 0, 0, 9]);
    assert_eq!(calls.get(), 2);
    assert_eq!(client.stats().retries, 1);
    assert_eq!(client.port().requests.len(), 2);
}

#[test]
fn read_times_out() {
    let mut client = client(MockPort::with_responder(|_: &[u8]| vec![]));

    match client.read_register(0x01, false) {
        Err(ClientError::Timeout { address, attempts }) => {
            assert_eq!(address, 0x01);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(client.port().requests.len(), 3);
}

#[test]
fn read_skips_bad_checksum() {
    let mut client = client(MockPort::with_responder(|request: &[u8]| {
        let address = Frame::new(request).address();
        let mut corrupt = frame(0x80, address, &[5, 5, 5, 5]);
        corrupt[6] ^= 0xff;
        vec![corrupt, frame(0x80, address, &[6, 6, 6, 6])]
    }));

    assert_eq!(client.read_register(0x03, false).unwrap(), [6, 6, 6, 6]);
    assert_eq!(client.stats().checksum_errors, 1);
}

#[test]
fn read_hidden_ignores_main_space() {
    let mut client = client(MockPort::with_responder(|request: &[u8]| {
        let address = Frame::new(request).address();
        vec![
            frame(0x80, address, &[1, 1, 1, 1]),
            frame(0x82, address, &[2, 2, 2, 2]),
        ]
    }));

    assert_eq!(client.read_register(0x00, true).unwrap(), [2, 2, 2, 2]);
    assert_eq!(client.port().requests[0][3], 0x02);
    assert_eq!(client.stats().discarded, 1);
}

#[test]
fn read_eof() {
    let mut port = MockPort::new();
    port.eof_when_empty = true;
    let mut client = client(port);

    assert!(matches!(
        client.read_register(0x00, false),
        Err(ClientError::UnexpectedEof)
    ));
}

#[test]
fn read_batch() {
    let mut client = client(MockPort::with_responder(echo_device([1, 2, 3, 4])));

    let data = client.read_batch(0x01, 3, false).unwrap();
    assert_eq!(data, [1u8, 2, 3, 4].repeat(3));
    // is_batch with a length of 3
    assert_eq!(client.port().requests[0][3], 0x4c);
}

#[test]
fn read_batch_bad_count() {
    let mut client = client(MockPort::new());

    for count in [0, 16] {
        assert!(matches!(
            client.read_batch(0x01, count, false),
            Err(ClientError::Protocol(ProtocolError::InvalidArgument(_)))
        ));
    }
    assert!(client.port().written.is_empty());
}

#[test]
fn write_register() {
    let mut client = client(MockPort::with_responder(echo_device([0; 4])));

    client
        .write_named("CREG_COM_RATES1", 0x01020304u32)
        .unwrap();
    assert_eq!(
        client.port().requests,
        vec![frame(0x80, 0x01, &[1, 2, 3, 4])]
    );
}

#[test]
fn write_float() {
    let mut client = client(MockPort::with_responder(echo_device([0; 4])));

    client.write_named("CREG_HOME_NORTH", -2.0f32).unwrap();
    let request = &client.port().requests[0];
    assert_eq!(Frame::new(request).raw_payload(), [0xc0, 0, 0, 0]);
}

#[test]
fn write_batch() {
    let mut client = client(MockPort::with_responder(echo_device([0; 4])));

    client
        .write_register(0x01, vec![0u8, 0, 0, 1, 0, 0, 0, 2], false)
        .unwrap();
    let request = &client.port().requests[0];
    assert_eq!(request.len(), 7 + 8);
    // has_data, is_batch, 2 registers
    assert_eq!(request[3], 0xc8);
}

#[test]
fn write_is_not_resent() {
    let mut client = client(MockPort::with_responder(|_: &[u8]| vec![]));

    assert!(matches!(
        client.write_register(0x01, 5u32, false),
        Err(ClientError::Timeout { attempts: 1, .. })
    ));
    assert_eq!(client.port().requests.len(), 1);
}

#[test]
fn write_waits_whole_window() {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let mut client = client(MockPort::with_responder(move |_: &[u8]| {
        seen.set(seen.get() + 1);
        vec![]
    }));
    let slow = *client.config();
    client.set_config(slow.with_retry(RetryPolicy::new(
        std::time::Duration::from_millis(5),
        4,
    )));

    let start = std::time::Instant::now();
    assert!(client.write_register(0x01, 5u32, false).is_err());
    assert!(start.elapsed() >= std::time::Duration::from_millis(20));
    assert_eq!(calls.get(), 1);
}

#[test]
fn write_field_keeps_other_bits() {
    let mut client = client(MockPort::with_responder(echo_device([0x50, 0, 0, 0x01])));

    client.set_baud_rate(9600).unwrap();
    let requests = &client.port().requests;
    assert_eq!(requests.len(), 2);
    assert_eq!(Frame::new(&requests[1]).raw_payload(), [0x00, 0, 0, 0x01]);
}

#[test]
fn set_baud_rate_unsupported() {
    let mut client = client(MockPort::new());

    assert!(matches!(
        client.set_baud_rate(1234),
        Err(ClientError::Protocol(ProtocolError::InvalidArgument(_)))
    ));
}

#[test]
fn read_fields() {
    let mut client = client(MockPort::with_responder(echo_device([0x50, 0, 0, 0])));

    let fields = client.read_fields("creg_com_settings").unwrap();
    assert_eq!(fields[0].0, "BAUD_RATE");
    match &fields[0].1 {
        FieldValue::Enum(e) => assert_eq!(e.name, "115200"),
        other => panic!("expected enumerated baud rate, got {:?}", other),
    }
}

#[test]
fn firmware_revision() {
    let mut client = client(MockPort::with_responder(echo_device(*b"U7C1")));

    assert_eq!(client.firmware_revision().unwrap(), "U7C1");
    assert_eq!(client.port().requests[0][4], 0xaa);
}

#[test]
fn command_acknowledged() {
    let mut client = client(MockPort::with_responder(echo_device([0; 4])));

    client.command("ZERO_GYROS").unwrap();
    assert_eq!(client.port().requests, vec![frame(0x00, 0xad, &[])]);
}

#[test]
fn command_failed() {
    let mut client = client(MockPort::with_responder(|request: &[u8]| {
        vec![frame(0x01, Frame::new(request).address(), &[])]
    }));

    assert!(matches!(
        client.command("FLASH_COMMIT"),
        Err(ClientError::CommandFailed { address: 0xab })
    ));
}

#[test]
fn access_checked_before_io() {
    let mut client = client(MockPort::with_responder(echo_device([0; 4])));

    assert!(matches!(
        client.read_named("ZERO_GYROS"),
        Err(ClientError::RegisterAccess {
            name: "ZERO_GYROS",
            access: Access::WriteOnly
        })
    ));
    assert!(matches!(
        client.write_named("DREG_HEALTH", 0u32),
        Err(ClientError::RegisterAccess {
            access: Access::ReadOnly,
            ..
        })
    ));
    assert!(matches!(
        client.execute_command(0xaa),
        Err(ClientError::RegisterAccess { .. })
    ));
    // a batch that runs into a data register
    assert!(matches!(
        client.write_register(0x54, vec![0u8; 8], false),
        Err(ClientError::RegisterAccess { .. })
    ));
    assert!(client.port().written.is_empty());
}

#[test]
fn unknown_register() {
    let mut client = client(MockPort::new());

    assert!(matches!(
        client.read_named("NOT_A_REGISTER"),
        Err(ClientError::UnknownRegister(_))
    ));
    assert!(client.port().written.is_empty());
}

#[test]
fn unknown_address_allowed() {
    let mut client = client(MockPort::with_responder(echo_device([7; 4])));

    assert_eq!(client.read_register(0x40, false).unwrap(), [7; 4]);
}
