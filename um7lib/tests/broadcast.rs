mod common;

use common::{client, euler, frame, health, MockPort};
use um7lib::protocol::{BroadcastKind, TelemetryPacket};
use um7lib::{BroadcastOptions, ClientError};

fn port_with(frames: &[Vec<u8>]) -> MockPort {
    let mut port = MockPort::new();
    port.eof_when_empty = true;
    for f in frames {
        port.feed(f);
    }
    port
}

#[test]
fn stream_in_order() {
    let mut client = client(port_with(&[health(3), euler(9102, 0, -9102), health(4)]));

    let packets: Vec<_> = client
        .broadcasts(BroadcastOptions::default().num_packets(3))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(packets.len(), 3);
    assert!(matches!(packets[0], TelemetryPacket::Health(h) if h.health == 3));
    match &packets[1] {
        TelemetryPacket::Euler(e) => {
            assert!((e.roll - 100.0).abs() < 0.01);
            assert!((e.yaw + 100.0).abs() < 0.01);
            assert_eq!(e.time, 1.5);
        }
        other => panic!("expected euler, got {:?}", other),
    }
    assert!(matches!(packets[2], TelemetryPacket::Health(h) if h.health == 4));
}

#[test]
fn filter_by_kind() {
    let mut client = client(port_with(&[health(1), euler(0, 0, 0), health(2)]));

    let mut stream = client.broadcasts(BroadcastOptions::default().kind(BroadcastKind::Euler));
    assert!(matches!(stream.next(), Some(Ok(TelemetryPacket::Euler(_)))));
    assert!(matches!(stream.next(), Some(Err(ClientError::UnexpectedEof))));
    assert!(stream.next().is_none());
    drop(stream);

    assert_eq!(client.stats().discarded, 2);
}

#[test]
fn flush_on_start() {
    let mut port = port_with(&[health(1)]);
    port.chunk = 64;
    let mut client = client(port);
    client.read_into_buffer().unwrap();
    client.port_mut().feed(&health(2));

    let first = client
        .broadcasts(BroadcastOptions::default().num_packets(1))
        .next();
    assert!(matches!(first, Some(Ok(TelemetryPacket::Health(h))) if h.health == 2));
}

#[test]
fn keep_buffer_without_flush() {
    let mut port = port_with(&[health(1)]);
    port.chunk = 64;
    let mut client = client(port);
    client.read_into_buffer().unwrap();
    client.port_mut().feed(&health(2));

    let options = BroadcastOptions::default()
        .num_packets(1)
        .flush_on_start(false);
    let first = client.broadcasts(options).next();
    assert!(matches!(first, Some(Ok(TelemetryPacket::Health(h))) if h.health == 1));
}

#[test]
fn skip_garbage_and_unknown_frames() {
    let mut bytes = vec![0xde, 0xad, b's', b'n'];
    bytes.extend(frame(0x80, 0x40, &[0; 4]));
    let mut corrupt = health(7);
    corrupt[5] ^= 0x10;
    bytes.extend(corrupt);
    bytes.extend(health(8));
    let mut client = client(port_with(&[bytes]));

    let mut stream = client.broadcasts(BroadcastOptions::default());
    assert!(matches!(
        stream.next(),
        Some(Ok(TelemetryPacket::Health(h))) if h.health == 8
    ));
    drop(stream);

    assert_eq!(client.stats().checksum_errors, 1);
    assert_eq!(client.stats().discarded, 1);
}

#[test]
fn restart_after_count() {
    let mut client = client(port_with(&[health(1), health(2)]));

    let options = BroadcastOptions::default()
        .num_packets(1)
        .flush_on_start(false);
    let a = client.broadcasts(options).next();
    let b = client.broadcasts(options).next();
    assert!(matches!(a, Some(Ok(TelemetryPacket::Health(h))) if h.health == 1));
    assert!(matches!(b, Some(Ok(TelemetryPacket::Health(h))) if h.health == 2));
}

#[test]
fn payload_spelling_preamble_split_across_reads() {
    let mut port = port_with(&[frame(0x80, 0x55, b"snp!"), health(9)]);
    port.chunk = 5;
    let mut client = client(port);

    let results: Vec<_> = client.broadcasts(BroadcastOptions::default()).collect();
    assert_eq!(results.len(), 3);
    assert!(matches!(
        results[0],
        Ok(TelemetryPacket::Health(h)) if h.health == u32::from_be_bytes(*b"snp!")
    ));
    assert!(matches!(results[1], Ok(TelemetryPacket::Health(h)) if h.health == 9));
    assert!(matches!(results[2], Err(ClientError::UnexpectedEof)));

    assert_eq!(client.stats().checksum_errors, 0);
    assert_eq!(client.stats().structural_errors, 0);
}

#[test]
fn full_buffer_keeps_frame_in_progress() {
    // default capacity is 512, so the buffer fills mid-frame
    let mut bytes = vec![0xaa; 505];
    bytes.extend(health(42));
    bytes.extend([0xaa; 40]);
    let mut port = port_with(&[bytes]);
    port.chunk = 128;
    let mut client = client(port);

    let mut stream = client.broadcasts(BroadcastOptions::default());
    assert!(matches!(
        stream.next(),
        Some(Ok(TelemetryPacket::Health(h))) if h.health == 42
    ));
    drop(stream);

    assert_eq!(client.stats().overflows, 1);
    assert_eq!(client.stats().checksum_errors, 0);
}

#[test]
fn full_buffer_of_garbage_is_dropped() {
    let mut bytes = vec![0xaa; 600];
    bytes.extend(health(5));
    let mut port = port_with(&[bytes]);
    port.chunk = 128;
    let mut client = client(port);

    let mut stream = client.broadcasts(BroadcastOptions::default());
    assert!(matches!(
        stream.next(),
        Some(Ok(TelemetryPacket::Health(h))) if h.health == 5
    ));
    drop(stream);

    assert_eq!(client.stats().overflows, 1);
}
