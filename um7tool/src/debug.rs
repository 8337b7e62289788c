use std::io::{Read, Write};

use um7lib::protocol::serialize::{Serializer, SerializerWrap};
use um7lib::FromStd;

/// Which way recorded bytes were travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Direction {
    Device = 0,
    Host = 1,
}

impl Direction {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Device),
            1 => Some(Self::Host),
            _ => None,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Device => "<<<",
            Self::Host => ">>>",
        }
    }
}

pub fn init_logging(debug: u8) -> anyhow::Result<()> {
    let level = match debug {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // RUST_LOG, if set, wins
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()?;
    Ok(())
}

#[derive(clap::Args, Debug, Clone)]
pub struct DumpArgs {
    /// Record all traffic to this file, for parse-dump.
    #[arg(long)]
    pub(crate) dump: Option<String>,
}

impl DumpArgs {
    pub fn wrap<F>(&self, port: F) -> anyhow::Result<DumpPort<F>> {
        let mut dump = None;
        if let Some(ref path) = self.dump {
            dump = Some(SerializerWrap::new(FromStd::new(
                std::fs::File::options()
                    .create(true)
                    .append(true)
                    .open(path)?,
            )));
        }

        Ok(DumpPort {
            inner: port,
            dump,
            pending: Vec::new(),
        })
    }
}

/// A port that copies everything passing through it into a dump file.
///
/// Each record is a direction byte, a big-endian u16 length, and the
/// bytes. Host records hold one flushed write, device records hold
/// whatever one read returned.
pub struct DumpPort<F> {
    inner: F,
    dump: Option<SerializerWrap<FromStd<std::fs::File>>>,
    pending: Vec<u8>,
}

impl<F> DumpPort<F> {
    fn record(&mut self, direction: Direction, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(ref mut dump) = self.dump {
            for chunk in bytes.chunks(u16::MAX as usize) {
                dump.write_u8(direction as u8)?;
                dump.write_be_u16(chunk.len() as u16)?;
                dump.write_bytes(chunk)?;
            }
        }
        Ok(())
    }
}

impl<F> Read for DumpPort<F>
where
    F: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let amt = self.inner.read(buf)?;
        if amt > 0 {
            self.record(Direction::Device, &buf[..amt])?;
        }
        Ok(amt)
    }
}

impl<F> Write for DumpPort<F>
where
    F: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let amt = self.inner.write(buf)?;
        if self.dump.is_some() {
            self.pending.extend_from_slice(&buf[..amt]);
        }
        Ok(amt)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            self.record(Direction::Host, &pending)?;
        }
        self.inner.flush()
    }
}

/// A client on a tool port, with traffic dumping.
pub type ToolClient = um7lib::ClientStd<DumpPort<crate::common::SerialPort>>;

/// Open the port and wrap it in a client.
pub fn connect(
    port: &crate::common::SerialPortArgs,
    client: &crate::common::ClientArgs,
    dump: &DumpArgs,
) -> anyhow::Result<ToolClient> {
    let port = dump.wrap(port.open()?)?;
    Ok(um7lib::Client::new_std_with(
        std::sync::Arc::new(um7lib::RegisterDirectory::um7()),
        client.config(),
        port,
    ))
}
