use crate::protocol::{self, BroadcastKind, Frame, TelemetryPacket};
use crate::{Client, ClientError, ProtocolError};

/// Controls a [Broadcasts] stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BroadcastOptions {
    /// Stop after this many packets. Runs until the port fails otherwise.
    pub num_packets: Option<usize>,
    /// Throw away anything already buffered before decoding.
    pub flush_on_start: bool,
    /// Only yield packets of this kind.
    pub kind: Option<BroadcastKind>,
}

impl Default for BroadcastOptions {
    fn default() -> Self {
        Self {
            num_packets: None,
            flush_on_start: true,
            kind: None,
        }
    }
}

impl BroadcastOptions {
    pub fn num_packets(self, num_packets: usize) -> Self {
        Self {
            num_packets: Some(num_packets),
            ..self
        }
    }

    pub fn flush_on_start(self, flush_on_start: bool) -> Self {
        Self {
            flush_on_start,
            ..self
        }
    }

    pub fn kind(self, kind: BroadcastKind) -> Self {
        Self {
            kind: Some(kind),
            ..self
        }
    }
}

/// An iterator over broadcast packets, pulling from a [Client]'s port.
///
/// Bad frames are logged and skipped. A port error is yielded once, and
/// then the iterator ends.
#[derive(Debug)]
pub struct Broadcasts<'a, F> {
    client: &'a mut Client<F>,
    options: BroadcastOptions,
    yielded: usize,
    done: bool,
}

impl<F> Client<F>
where
    F: embedded_io::Read,
{
    /// Stream broadcast telemetry from the sensor.
    pub fn broadcasts(&mut self, options: BroadcastOptions) -> Broadcasts<'_, F> {
        if options.flush_on_start {
            self.clear_buffer();
        }
        Broadcasts {
            client: self,
            options,
            yielded: 0,
            done: false,
        }
    }
}

impl<'a, F> Broadcasts<'a, F>
where
    F: embedded_io::Read,
{
    /// Packets yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    fn decode(&mut self, bytes: &[u8]) -> Option<TelemetryPacket> {
        let frame = Frame::new(bytes);
        let stats = self.client.stats_mut();

        if !protocol::verify_checksum(&frame) {
            log::warn!("dropping frame with bad checksum: {:02x?}", bytes);
            stats.checksum_errors += 1;
            return None;
        }
        if !protocol::validate_structure(&frame) {
            stats.structural_errors += 1;
            return None;
        }

        match TelemetryPacket::decode(&frame) {
            Ok(packet) => {
                if self.options.kind.map_or(true, |k| k == packet.kind()) {
                    Some(packet)
                } else {
                    stats.discarded += 1;
                    None
                }
            }
            Err(ProtocolError::UnrecognizedFrame { address, len }) => {
                log::error!(
                    "unrecognized broadcast: address {:#04x}, {} bytes",
                    address,
                    len
                );
                stats.discarded += 1;
                None
            }
            Err(e) => {
                log::error!("{}", e);
                stats.discarded += 1;
                None
            }
        }
    }
}

impl<'a, F> Iterator for Broadcasts<'a, F>
where
    F: embedded_io::Read,
{
    type Item = Result<TelemetryPacket, ClientError<F::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.options.num_packets.is_some_and(|n| self.yielded >= n) {
            self.done = true;
            return None;
        }

        loop {
            while let Some(bytes) = self.client.take_frame() {
                if let Some(packet) = self.decode(&bytes) {
                    self.yielded += 1;
                    return Some(Ok(packet));
                }
            }

            if let Err(e) = self.client.read_into_buffer() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

impl<'a, F> core::iter::FusedIterator for Broadcasts<'a, F> where F: embedded_io::Read {}

#[cfg(test)]
mod test {
    use super::*;

    use crate::protocol::build_request_frame;

    #[test]
    fn options_builder() {
        let options = BroadcastOptions::default()
            .num_packets(3)
            .flush_on_start(false)
            .kind(BroadcastKind::Euler);
        assert_eq!(options.num_packets, Some(3));
        assert!(!options.flush_on_start);
        assert_eq!(options.kind, Some(BroadcastKind::Euler));
        assert!(BroadcastOptions::default().flush_on_start);
    }

    #[test]
    fn count_and_fuse() {
        let mut input = build_request_frame(0x80, 0x55, &[0, 0, 0, 7]);
        input.extend(build_request_frame(0x80, 0x55, &[0, 0, 0, 8]));
        let mut client = Client::new_std(std::io::Cursor::new(input));

        let mut stream = client.broadcasts(BroadcastOptions::default().num_packets(1));
        assert!(matches!(
            stream.next(),
            Some(Ok(TelemetryPacket::Health(h))) if h.health == 7
        ));
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn eof_ends_stream() {
        let input = build_request_frame(0x80, 0x55, &[0, 0, 0, 1]);
        let mut client = Client::new_std(std::io::Cursor::new(input));

        let mut stream = client.broadcasts(BroadcastOptions::default());
        assert!(matches!(stream.next(), Some(Ok(TelemetryPacket::Health(_)))));
        assert!(matches!(stream.next(), Some(Err(ClientError::UnexpectedEof))));
        assert!(stream.next().is_none());
    }
}
