#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use embedded_io::{ErrorKind, ErrorType, Read, Write};

use um7lib::protocol::{build_request_frame, Frame};
use um7lib::{Client, ClientConfig, RegisterDirectory, RetryPolicy};

/// Decides what the device sends back for each flushed request.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>>>;

/// An in-memory port with a scripted device on the other end.
pub struct MockPort {
    rx: VecDeque<u8>,
    pending: Vec<u8>,
    /// Every byte ever written.
    pub written: Vec<u8>,
    /// Every request frame flushed.
    pub requests: Vec<Vec<u8>>,
    responder: Option<Responder>,
    /// Return end of file instead of timing out when out of bytes.
    pub eof_when_empty: bool,
    /// Most bytes handed out per read.
    pub chunk: usize,
}

impl MockPort {
    pub fn new() -> Self {
        Self {
            rx: VecDeque::new(),
            pending: Vec::new(),
            written: Vec::new(),
            requests: Vec::new(),
            responder: None,
            eof_when_empty: false,
            chunk: 5,
        }
    }

    pub fn with_responder<R>(responder: R) -> Self
    where
        R: FnMut(&[u8]) -> Vec<Vec<u8>> + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Queue bytes for the host to read.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }
}

impl ErrorType for MockPort {
    type Error = ErrorKind;
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.rx.is_empty() {
            if self.eof_when_empty {
                return Ok(0);
            }
            std::thread::sleep(Duration::from_millis(1));
            return Err(ErrorKind::TimedOut);
        }

        let amt = buf.len().min(self.chunk).min(self.rx.len());
        for (dest, src) in buf.iter_mut().zip(self.rx.drain(..amt)) {
            *dest = src;
        }
        Ok(amt)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.pending.extend_from_slice(buf);
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let request = std::mem::take(&mut self.pending);
        if request.is_empty() {
            return Ok(());
        }
        if let Some(ref mut responder) = self.responder {
            for reply in responder(&request) {
                self.rx.extend(reply);
            }
        }
        self.requests.push(request);
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A frame as the device would send it.
pub fn frame(type_byte: u8, address: u8, payload: &[u8]) -> Vec<u8> {
    build_request_frame(type_byte, address, payload)
}

/// A short retry policy so timeouts do not slow the tests down.
pub fn fast_config() -> ClientConfig {
    ClientConfig::default()
        .with_retry(RetryPolicy::new(Duration::from_millis(10), 3))
        .with_command_timeout(Duration::from_millis(50))
}

pub fn client(port: MockPort) -> Client<MockPort> {
    init_logging();
    Client::new_with(
        std::sync::Arc::new(RegisterDirectory::um7()),
        fast_config(),
        port,
    )
}

/// Answer reads of any register with `value`, and acknowledge writes and
/// commands.
pub fn echo_device(value: [u8; 4]) -> impl FnMut(&[u8]) -> Vec<Vec<u8>> {
    move |request| {
        let req = Frame::new(request);
        let typ = req.packet_type();
        let hidden = if typ.hidden { 0x02 } else { 0x00 };
        if typ.has_data || req.address() > 0xaa {
            vec![frame(hidden, req.address(), &[])]
        } else if typ.is_batch {
            let payload = value.repeat(typ.batch_length as usize);
            let type_byte = 0xc0 | (typ.batch_length << 2) | hidden;
            vec![frame(type_byte, req.address(), &payload)]
        } else {
            vec![frame(0x80 | hidden, req.address(), &value)]
        }
    }
}

pub fn health(value: u32) -> Vec<u8> {
    frame(0x80, 0x55, &value.to_be_bytes())
}

/// An Euler broadcast with the given raw angles and zero rates.
pub fn euler(roll: i16, pitch: i16, yaw: i16) -> Vec<u8> {
    let mut payload = Vec::new();
    for v in [roll, pitch, yaw, 0, 0, 0, 0, 0] {
        payload.extend(v.to_be_bytes());
    }
    payload.extend(1.5f32.to_be_bytes());
    // 5 registers
    frame(0xd4, 0x70, &payload)
}
