use std::sync::Arc;
use std::time::Instant;

use crate::protocol::{
    self, serialize, Frame, PacketType, FRAME_OVERHEAD, MAX_BATCH_LENGTH, MAX_FRAME_SIZE,
};
use crate::registers::{self, FieldValue, RegisterDescriptor, RegisterDirectory, RegisterSpace};
use crate::{ClientConfig, ClientError, ProtocolError, RegisterValue, RetryPolicy};

/// Re-export to allow using [Client] with [std::io] streams.
pub use embedded_io_adapters::std::FromStd;

/// Running counts of what the client has seen on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientStats {
    /// Candidate frames carved out of the receive buffer.
    pub frames: u64,
    pub checksum_errors: u64,
    pub structural_errors: u64,
    /// Good frames dropped because they did not answer the request in flight.
    pub discarded: u64,
    /// Requests sent again after no answer.
    pub retries: u64,
    /// Times the receive buffer filled up without a frame and was cut back.
    pub overflows: u64,
}

/// What a response to the request in flight must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingRequest {
    pub address: u8,
    pub hidden: bool,
    pub expected_len: usize,
}

impl PendingRequest {
    /// Expect the usual reply to a request of this type.
    pub fn reply_to(address: u8, packet_type: PacketType) -> Self {
        Self {
            address,
            hidden: packet_type.hidden,
            expected_len: packet_type.reply_len(),
        }
    }

    /// Expect a bare acknowledgement without data.
    pub fn ack(address: u8, hidden: bool) -> Self {
        Self {
            address,
            hidden,
            expected_len: FRAME_OVERHEAD,
        }
    }

    pub fn matches(&self, frame: &Frame) -> bool {
        frame.address() == self.address
            && frame.packet_type().hidden == self.hidden
            && frame.len() == self.expected_len
    }
}

/// A client for the UM7 serial protocol.
///
/// The client owns the port and the receive buffer. Register
/// transactions and broadcast streams both need `&mut self`, so only
/// one of them can be pulling bytes off the port at a time.
#[derive(Debug)]
pub struct Client<F> {
    port: F,
    directory: Arc<RegisterDirectory>,
    config: ClientConfig,
    buffer: Vec<u8>,
    stats: ClientStats,
}

/// A client using an [std::io] port.
pub type ClientStd<F> = Client<FromStd<F>>;

impl<F> Client<F> {
    /// Create a new client with the UM7 register map and default settings.
    pub fn new(port: F) -> Self {
        Self::new_with(
            Arc::new(RegisterDirectory::um7()),
            ClientConfig::default(),
            port,
        )
    }

    /// Create a new client with the provided directory and settings.
    pub fn new_with(directory: Arc<RegisterDirectory>, config: ClientConfig, port: F) -> Self {
        Self {
            port,
            directory,
            buffer: Vec::with_capacity(config.buffer_capacity),
            config,
            stats: ClientStats::default(),
        }
    }

    /// Release the components used to create this client.
    pub fn free(self) -> (Arc<RegisterDirectory>, F) {
        (self.directory, self.port)
    }

    /// Get the underlying port.
    pub fn port(&self) -> &F {
        &self.port
    }

    /// Get the underlying port, mutably.
    ///
    /// Using this won't confuse the client, but it might cause you to miss
    /// frames if you are not careful.
    pub fn port_mut(&mut self) -> &mut F {
        &mut self.port
    }

    /// Bytes received but not yet carved into frames.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Throw away everything received so far.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    pub fn directory(&self) -> &Arc<RegisterDirectory> {
        &self.directory
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ClientConfig) {
        self.config = config;
    }

    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ClientStats {
        &mut self.stats
    }

    /// Carve the next candidate frame out of the receive buffer.
    ///
    /// The frame is removed along with any garbage before it. Nothing
    /// is checked yet.
    pub fn take_frame(&mut self) -> Option<Vec<u8>> {
        let range = protocol::find_frame(&self.buffer)?;
        let frame = self.buffer[range.clone()].to_vec();
        self.buffer.drain(..range.end);
        self.stats.frames += 1;
        log::trace!("<<< {:02x?}", frame);
        Some(frame)
    }

    /// Find a register by name.
    pub fn lookup(
        &self,
        name: &str,
    ) -> Result<&'static RegisterDescriptor, ClientError<<F as embedded_io::ErrorType>::Error>>
    where
        F: embedded_io::ErrorType,
    {
        self.directory
            .lookup(name)
            .ok_or_else(|| ClientError::UnknownRegister(name.to_owned()))
    }

    /// Refuse reads of write-only and writes of read-only registers.
    ///
    /// Addresses missing from the directory are allowed through.
    fn check_access(
        &self,
        address: u8,
        hidden: bool,
        write: bool,
    ) -> Result<(), ClientError<<F as embedded_io::ErrorType>::Error>>
    where
        F: embedded_io::ErrorType,
    {
        let space = RegisterSpace::from_hidden(hidden);
        if let Some(reg) = self.directory.lookup_address(space, address) {
            let allowed = if write {
                reg.access.can_write()
            } else {
                reg.access.can_read()
            };
            if !allowed {
                return Err(ClientError::RegisterAccess {
                    name: reg.name,
                    access: reg.access,
                });
            }
        }
        Ok(())
    }

    fn check_access_range(
        &self,
        address: u8,
        count: usize,
        hidden: bool,
        write: bool,
    ) -> Result<(), ClientError<<F as embedded_io::ErrorType>::Error>>
    where
        F: embedded_io::ErrorType,
    {
        for offset in 0..count {
            self.check_access(address.wrapping_add(offset as u8), hidden, write)?;
        }
        Ok(())
    }
}

impl<F> Client<FromStd<F>> {
    /// Create a new client using an [std::io] port.
    pub fn new_std(port: F) -> Self {
        Self::new(FromStd::new(port))
    }

    /// Create a new client using an [std::io] port, with the provided
    /// directory and settings.
    pub fn new_std_with(directory: Arc<RegisterDirectory>, config: ClientConfig, port: F) -> Self {
        Self::new_with(directory, config, FromStd::new(port))
    }
}

/// A read that timed out without data is not an error here.
fn is_idle<E: embedded_io::Error>(e: &E) -> bool {
    matches!(
        e.kind(),
        embedded_io::ErrorKind::TimedOut | embedded_io::ErrorKind::Interrupted
    )
}

/// How much of a full receive buffer to drop.
///
/// A frame still arriving is shorter than [MAX_FRAME_SIZE], so it can
/// only start in the last few bytes. Everything before the first
/// preamble there is dropped, or everything if there is none.
fn overflow_cut(buffer: &[u8]) -> usize {
    let tail = buffer.len().saturating_sub(MAX_FRAME_SIZE - 1);
    match protocol::preamble_start(&buffer[tail..]) {
        Some(start) => tail + start,
        None => buffer.len(),
    }
}

impl<F> Client<F>
where
    F: embedded_io::Read,
{
    /// Read whatever the port has into the receive buffer.
    ///
    /// Returns the number of bytes read, which is 0 if the port timed
    /// out with nothing to offer. If the buffer is already full, the
    /// garbage in it is dropped first to make room, keeping only a frame
    /// that may still be arriving at the end.
    pub fn read_into_buffer(&mut self) -> Result<usize, ClientError<F::Error>> {
        // full, and still no frame in it: this is garbage
        if self.buffer.len() >= self.config.buffer_capacity {
            let cut = overflow_cut(&self.buffer);
            log::warn!(
                "receive buffer full without a frame, dropping {} bytes",
                cut
            );
            self.buffer.drain(..cut);
            self.stats.overflows += 1;
        }

        let start = self.buffer.len();
        let want = self
            .config
            .read_chunk
            .min(self.config.buffer_capacity - start)
            .max(1);
        self.buffer.resize(start + want, 0);

        let res = self.port.read(&mut self.buffer[start..]);
        match res {
            Ok(0) => {
                self.buffer.truncate(start);
                // end of file is an error
                Err(ClientError::UnexpectedEof)
            }
            Ok(amt) => {
                self.buffer.truncate(start + amt);
                Ok(amt)
            }
            Err(e) => {
                self.buffer.truncate(start);
                if is_idle(&e) {
                    Ok(0)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Pump the port until a frame matching `pending` arrives, or the
    /// deadline passes.
    ///
    /// Every other frame is dropped: bad checksums, malformed frames,
    /// and broadcasts alike.
    pub fn await_response(
        &mut self,
        pending: &PendingRequest,
        deadline: Instant,
    ) -> Result<Option<Vec<u8>>, ClientError<F::Error>> {
        loop {
            while let Some(bytes) = self.take_frame() {
                let frame = Frame::new(&bytes);

                if !protocol::verify_checksum(&frame) {
                    log::warn!("dropping frame with bad checksum: {:02x?}", bytes);
                    self.stats.checksum_errors += 1;
                    continue;
                }

                let typ = frame.packet_type();
                if typ.command_failed
                    && frame.address() == pending.address
                    && typ.hidden == pending.hidden
                {
                    return Err(ClientError::CommandFailed {
                        address: pending.address,
                    });
                }

                if !protocol::validate_structure(&frame) {
                    self.stats.structural_errors += 1;
                    continue;
                }

                if pending.matches(&frame) {
                    return Ok(Some(bytes));
                }

                log::debug!(
                    "discarding frame from {:#04x} ({} bytes) while waiting for {:#04x}",
                    frame.address(),
                    frame.len(),
                    pending.address
                );
                self.stats.discarded += 1;
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            self.read_into_buffer()?;
        }
    }
}

impl<F> Client<F>
where
    F: embedded_io::Write,
{
    /// Build a frame and write it to the port.
    pub fn send_frame(
        &mut self,
        packet_type: PacketType,
        address: u8,
        payload: &[u8],
    ) -> Result<(), ClientError<F::Error>> {
        let type_byte = packet_type.to_byte().map_err(ClientError::protocol)?;
        log::debug!(
            ">>> type {:#04x} address {:#04x} payload {:02x?}",
            type_byte,
            address,
            payload
        );

        let mut ser = serialize::SerializerWrap::new(&mut self.port);
        serialize::write_frame(&mut ser, type_byte, address, payload)?;
        self.port.flush()?;
        Ok(())
    }
}

impl<F> Client<F>
where
    F: embedded_io::Read + embedded_io::Write,
{
    /// Send a request and wait for its response, resending per `retry`.
    ///
    /// Returns the whole response frame.
    pub fn transact(
        &mut self,
        packet_type: PacketType,
        address: u8,
        payload: &[u8],
        pending: PendingRequest,
        retry: RetryPolicy,
    ) -> Result<Vec<u8>, ClientError<F::Error>> {
        for attempt in 1..=retry.max_attempts {
            if attempt > 1 {
                log::debug!("no response from {:#04x}, attempt {}", address, attempt);
                self.stats.retries += 1;
            }

            self.send_frame(packet_type, address, payload)?;
            let deadline = Instant::now() + retry.interval;
            if let Some(frame) = self.await_response(&pending, deadline)? {
                return Ok(frame);
            }
        }

        Err(ClientError::Timeout {
            address,
            attempts: retry.max_attempts,
        })
    }

    /// Read one register and return its 4 raw bytes.
    pub fn read_register(
        &mut self,
        address: u8,
        hidden: bool,
    ) -> Result<[u8; 4], ClientError<F::Error>> {
        self.check_access(address, hidden, false)?;

        let typ = PacketType::read(hidden);
        let pending = PendingRequest::reply_to(address, typ);
        let frame = self.transact(typ, address, &[], pending, self.config.retry)?;

        <[u8; 4]>::try_from(Frame::new(&frame).raw_payload())
            .map_err(|_| ClientError::protocol(ProtocolError::Payload { address }))
    }

    /// Read `count` consecutive registers in one batch.
    pub fn read_batch(
        &mut self,
        address: u8,
        count: u8,
        hidden: bool,
    ) -> Result<Vec<u8>, ClientError<F::Error>> {
        if count == 0 || count > MAX_BATCH_LENGTH {
            return Err(ClientError::protocol(ProtocolError::InvalidArgument(
                "batch must cover 1 to 15 registers",
            )));
        }
        self.check_access_range(address, count as usize, hidden, false)?;

        let typ = PacketType::batch_read(count, hidden);
        let pending = PendingRequest::reply_to(address, typ);
        let frame = self.transact(typ, address, &[], pending, self.config.retry)?;
        Ok(Frame::new(&frame).raw_payload().to_vec())
    }

    /// Write one register, or several consecutive ones if given more
    /// than 4 bytes.
    ///
    /// The write is sent once, and the acknowledgement awaited for the
    /// whole retry window.
    pub fn write_register<V>(
        &mut self,
        address: u8,
        value: V,
        hidden: bool,
    ) -> Result<(), ClientError<F::Error>>
    where
        V: Into<RegisterValue>,
    {
        let value = value.into();
        let payload = value.to_payload().map_err(ClientError::protocol)?;
        let count = value.register_count();
        if count > MAX_BATCH_LENGTH as usize {
            return Err(ClientError::protocol(ProtocolError::InvalidArgument(
                "write must cover at most 15 registers",
            )));
        }
        self.check_access_range(address, count, hidden, true)?;

        let typ = PacketType::write(count as u8, hidden);
        let pending = PendingRequest::ack(address, hidden);
        let retry = RetryPolicy::once(self.config.retry.window());
        self.transact(typ, address, &payload, pending, retry)?;
        Ok(())
    }

    /// Run a command register and wait for it to complete.
    pub fn execute_command(&mut self, address: u8) -> Result<(), ClientError<F::Error>> {
        self.check_access(address, false, true)?;

        let typ = PacketType::read(false);
        let pending = PendingRequest::ack(address, false);
        let retry = RetryPolicy::once(self.config.command_timeout);
        self.transact(typ, address, &[], pending, retry)?;
        Ok(())
    }

    /// Read a register by name.
    pub fn read_named(&mut self, name: &str) -> Result<[u8; 4], ClientError<F::Error>> {
        let reg = self.lookup(name)?;
        self.read_register(reg.address, reg.is_hidden())
    }

    /// Read a register by name and decode its fields.
    pub fn read_fields(
        &mut self,
        name: &str,
    ) -> Result<Vec<(&'static str, FieldValue)>, ClientError<F::Error>> {
        let reg = self.lookup(name)?;
        let payload = self.read_register(reg.address, reg.is_hidden())?;
        Ok(reg.decode_bytes(payload))
    }

    /// Write a register by name.
    pub fn write_named<V>(&mut self, name: &str, value: V) -> Result<(), ClientError<F::Error>>
    where
        V: Into<RegisterValue>,
    {
        let reg = self.lookup(name)?;
        self.write_register(reg.address, value, reg.is_hidden())
    }

    /// Change one field of a register, leaving the rest as they are.
    pub fn write_field(
        &mut self,
        name: &str,
        field: &str,
        raw: u32,
    ) -> Result<(), ClientError<F::Error>> {
        let reg = self.lookup(name)?;
        let field = reg
            .field(field)
            .ok_or_else(|| ClientError::UnknownRegister(format!("{}.{}", reg.name, field)))?;

        let word = u32::from_be_bytes(self.read_register(reg.address, reg.is_hidden())?);
        let word = field.insert(word, raw).map_err(ClientError::protocol)?;
        self.write_register(reg.address, word, reg.is_hidden())
    }

    /// Run a command register by name.
    pub fn command(&mut self, name: &str) -> Result<(), ClientError<F::Error>> {
        let reg = self.lookup(name)?;
        self.execute_command(reg.address)
    }

    /// The four character firmware revision.
    pub fn firmware_revision(&mut self) -> Result<String, ClientError<F::Error>> {
        let payload = self.read_named("GET_FW_REVISION")?;
        Ok(payload.iter().map(|b| *b as char).collect())
    }

    /// Ask the sensor to switch its main serial port to a new baud rate.
    ///
    /// The sensor switches as soon as it acknowledges, so the port must
    /// be reopened at the new rate afterwards.
    pub fn set_baud_rate(&mut self, baud: u32) -> Result<(), ClientError<F::Error>> {
        let code = registers::baud_rate_code(baud).ok_or(ClientError::protocol(
            ProtocolError::InvalidArgument("unsupported baud rate"),
        ))?;
        self.write_field("CREG_COM_SETTINGS", "BAUD_RATE", code)
    }
}
