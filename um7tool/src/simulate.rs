use std::collections::HashMap;
use std::time::{Duration, Instant};

use um7lib::protocol::{self, Frame, PacketType, EULER_SCALE, QUATERNION_SCALE};
use um7lib::registers::{self, RegisterKind, RegisterSpace};
use um7lib::{Client, ClientError};

use crate::common::SerialPort;

#[derive(clap::Args, Debug)]
pub struct SimulateOpts {
    #[arg(default_value = "localhost:8855")]
    bind: String,
    /// Firmware revision to report, four characters.
    #[arg(long, default_value = "U7SM")]
    version: String,
    /// Milliseconds between broadcasts, 0 for none.
    #[arg(long, default_value_t = 100)]
    rate: u64,
    /// Answer these commands with the failure bit set.
    #[arg(long)]
    fail: Vec<String>,
    #[command(flatten)]
    dump: crate::debug::DumpArgs,
}

impl crate::ToolRun for SimulateOpts {
    fn run(&self) -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind(&self.bind)?;
        eprintln!("Listening on {}.", self.bind);

        let mut storage = Storage::new();
        loop {
            let (stream, addr) = listener.accept()?;
            eprintln!("Connected to {}.", addr);

            // short, so broadcasts go out on time
            stream.set_read_timeout(Some(Duration::from_millis(5)))?;
            stream.set_nodelay(true)?;

            let port = self
                .dump
                .wrap(SerialPort::Tcp(std::io::BufWriter::new(stream)))?;
            let client = Client::new_std(port);
            match Simulator::new(client, self, &mut storage).simulate() {
                Err(ClientError::UnexpectedEof) => {
                    eprintln!("Disconnected from {}.", addr);
                }
                Err(ClientError::Io(e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
                    ) =>
                {
                    eprintln!("Disconnected from {}.", addr);
                }
                Err(e) => anyhow::bail!(e),
                Ok(()) => {}
            }
        }
    }
}

/// Register contents, kept across connections.
#[derive(Debug, Clone, Default)]
pub struct Storage {
    words: HashMap<(bool, u8), u32>,
}

impl Storage {
    pub fn new() -> Self {
        let mut storage = Self::default();

        let directory = um7lib::RegisterDirectory::um7();
        if let Some(reg) = directory.lookup("CREG_COM_SETTINGS") {
            let code = registers::baud_rate_code(protocol::BAUD_RATE);
            if let (Some(field), Some(code)) = (reg.field("BAUD_RATE"), code) {
                if let Ok(word) = field.insert(0, code) {
                    storage.set(false, reg.address, word);
                }
            }
        }

        storage
    }

    pub fn get(&self, hidden: bool, address: u8) -> u32 {
        self.words.get(&(hidden, address)).copied().unwrap_or(0)
    }

    pub fn set(&mut self, hidden: bool, address: u8, word: u32) {
        self.words.insert((hidden, address), word);
    }

    /// Store consecutive registers from a payload.
    fn set_payload(&mut self, hidden: bool, address: u8, payload: &[u8]) {
        for (i, chunk) in payload.chunks_exact(4).enumerate() {
            let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.set(hidden, address.wrapping_add(i as u8), word);
        }
    }
}

struct Simulator<'a, F> {
    client: Client<F>,
    opts: &'a SimulateOpts,
    storage: &'a mut Storage,
    started: Instant,
}

impl<'a, F> Simulator<'a, F>
where
    F: embedded_io::Read + embedded_io::Write,
{
    fn new(client: Client<F>, opts: &'a SimulateOpts, storage: &'a mut Storage) -> Self {
        Self {
            client,
            opts,
            storage,
            started: Instant::now(),
        }
    }

    fn simulate(&mut self) -> Result<(), ClientError<F::Error>> {
        let rate = Duration::from_millis(self.opts.rate);
        let mut next_broadcast = Instant::now() + rate;

        loop {
            self.client.read_into_buffer()?;
            while let Some(bytes) = self.client.take_frame() {
                self.handle_frame(&bytes)?;
            }

            if !rate.is_zero() && Instant::now() >= next_broadcast {
                self.broadcast()?;
                next_broadcast += rate;
            }
        }
    }

    fn handle_frame(&mut self, bytes: &[u8]) -> Result<(), ClientError<F::Error>> {
        let frame = Frame::new(bytes);
        if !protocol::verify_checksum(&frame) || !protocol::validate_structure(&frame) {
            log::warn!("ignoring bad frame: {:02x?}", bytes);
            return Ok(());
        }

        let typ = frame.packet_type();
        let address = frame.address();
        let space = RegisterSpace::from_hidden(typ.hidden);
        let reg = self.client.directory().lookup_address(space, address);

        if typ.has_data {
            match reg {
                Some(reg) if !reg.access.can_write() => {
                    log::warn!("ignoring write to {}", reg.name);
                }
                _ => self.storage.set_payload(typ.hidden, address, frame.raw_payload()),
            }
            return self.client.send_frame(PacketType::read(typ.hidden), address, &[]);
        }

        match reg {
            Some(reg) if reg.kind == RegisterKind::Command && reg.access.can_read() => {
                let mut version = [b' '; 4];
                for (dest, src) in version.iter_mut().zip(self.opts.version.bytes()) {
                    *dest = src;
                }
                self.client
                    .send_frame(PacketType::write(1, typ.hidden), address, &version)
            }
            Some(reg) if reg.kind == RegisterKind::Command => {
                eprintln!("Command {}.", reg.name);
                let failed = self
                    .opts
                    .fail
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(reg.name));
                let ack = PacketType {
                    command_failed: failed,
                    ..PacketType::read(typ.hidden)
                };
                self.client.send_frame(ack, address, &[])
            }
            _ => {
                let count = if typ.is_batch { typ.batch_length.max(1) } else { 1 };
                let mut payload = Vec::with_capacity(4 * count as usize);
                for i in 0..count {
                    let word = self.storage.get(typ.hidden, address.wrapping_add(i));
                    payload.extend_from_slice(&word.to_be_bytes());
                }
                self.client
                    .send_frame(PacketType::write(count, typ.hidden), address, &payload)
            }
        }
    }

    /// Send health, Euler, and quaternion packets for a slow spin about
    /// the vertical axis.
    fn broadcast(&mut self) -> Result<(), ClientError<F::Error>> {
        let time = self.started.elapsed().as_secs_f32();
        let yaw = (time * 10.0) % 360.0 - 180.0;

        let health = 0u32;
        self.send_broadcast(0x55, &health.to_be_bytes())?;

        let mut euler = Vec::with_capacity(20);
        for v in [0.0, 0.0, yaw, 0.0, 0.0, 0.0, 10.0, 0.0] {
            euler.extend_from_slice(&((v * EULER_SCALE) as i16).to_be_bytes());
        }
        euler.extend_from_slice(&time.to_be_bytes());
        self.send_broadcast(0x70, &euler)?;

        let half = yaw.to_radians() / 2.0;
        let mut quaternion = Vec::with_capacity(12);
        for v in [half.cos(), 0.0, 0.0, half.sin()] {
            quaternion.extend_from_slice(&((v * QUATERNION_SCALE) as i16).to_be_bytes());
        }
        quaternion.extend_from_slice(&time.to_be_bytes());
        self.send_broadcast(0x6d, &quaternion)
    }

    fn send_broadcast(&mut self, address: u8, payload: &[u8]) -> Result<(), ClientError<F::Error>> {
        self.storage.set_payload(false, address, payload);
        let typ = PacketType::write((payload.len() / 4) as u8, false);
        self.client.send_frame(typ, address, payload)
    }
}
