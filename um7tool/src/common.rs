use std::io::{Read, Write};
use std::time::Duration;

use um7lib::registers::{FieldValue, RegisterDescriptor, RegisterSpace};
use um7lib::{ClientConfig, RegisterDirectory, RetryPolicy};

/// USB vendor id of the FTDI bridge on UM7 cables.
pub const FTDI_VID: u16 = 0x0403;

#[derive(clap::Args, Debug, Clone)]
pub struct SerialPortArgs {
    /// Serial port. A file with --plain-file, or host:port with --tcp.
    #[arg(short, long, default_value_t = default_serial_port())]
    port: String,
    /// Use the USB serial port with this serial number instead.
    #[arg(long, conflicts_with_all = ["plain_file", "tcp"])]
    serial_number: Option<String>,
    #[arg(short, long, default_value_t = um7lib::protocol::BAUD_RATE)]
    baud: u32,
    /// Port read timeout, in milliseconds.
    #[arg(long, default_value_t = 10)]
    read_timeout: u64,
    #[arg(long)]
    plain_file: bool,
    #[arg(long)]
    tcp: bool,
}

#[derive(Debug)]
pub enum SerialPort {
    Serial(std::io::BufWriter<Box<dyn serialport::SerialPort>>),
    File(std::io::BufWriter<std::fs::File>),
    Tcp(std::io::BufWriter<std::net::TcpStream>),
}

/// Every USB serial port, with its USB details.
pub fn usb_ports() -> Vec<(String, serialport::UsbPortInfo)> {
    let Ok(infos) = serialport::available_ports() else {
        return Vec::new();
    };

    infos
        .into_iter()
        .filter_map(|info| match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Some((info.port_name, usb)),
            _ => None,
        })
        .collect()
}

pub fn default_serial_port() -> String {
    // an FTDI bridge is the best guess
    if let Some((name, _)) = usb_ports().into_iter().find(|(_, usb)| usb.vid == FTDI_VID) {
        return name;
    }

    if let Ok(infos) = serialport::available_ports() {
        for info in infos {
            #[cfg(target_os = "macos")]
            if info.port_name.ends_with(".Bluetooth-Incoming-Port") {
                continue;
            }

            #[cfg(target_os = "macos")]
            if info.port_name.starts_with("/dev/tty.") {
                // cu. ports don't wait for carrier detect
                continue;
            }

            return info.port_name;
        }
    }

    "/dev/ttyUSB0".to_owned()
}

fn find_port_by_serial(serial_number: &str) -> anyhow::Result<String> {
    usb_ports()
        .into_iter()
        .find(|(_, usb)| usb.serial_number.as_deref() == Some(serial_number))
        .map(|(name, _)| name)
        .ok_or_else(|| anyhow::anyhow!("no USB serial port with serial number {}", serial_number))
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let res = match self {
            Self::Serial(port) => port.get_mut().read(buf),
            Self::File(port) => port.get_mut().read(buf),
            Self::Tcp(port) => port.get_mut().read(buf),
        };

        // sockets report a read timeout as WouldBlock on some platforms
        match res {
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(std::io::ErrorKind::TimedOut.into())
            }
            other => other,
        }
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Serial(port) => port.write(buf),
            Self::File(port) => port.write(buf),
            Self::Tcp(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Serial(port) => port.flush(),
            Self::File(port) => port.flush(),
            Self::Tcp(port) => port.flush(),
        }
    }
}

impl SerialPortArgs {
    pub fn open(&self) -> anyhow::Result<SerialPort> {
        let timeout = Duration::from_millis(self.read_timeout.max(1));

        if self.tcp {
            let port = std::net::TcpStream::connect(&self.port)?;
            port.set_read_timeout(Some(timeout))?;
            port.set_nodelay(true)?;
            Ok(SerialPort::Tcp(std::io::BufWriter::new(port)))
        } else if self.plain_file {
            let port = std::fs::File::options()
                .read(true)
                .write(true)
                .open(&self.port)?;

            Ok(SerialPort::File(std::io::BufWriter::new(port)))
        } else {
            let name = match self.serial_number {
                Some(ref serial_number) => find_port_by_serial(serial_number)?,
                None => self.port.clone(),
            };
            log::info!("opening {} at {} baud", name, self.baud);
            let port = serialport::new(&name, self.baud).timeout(timeout).open()?;
            Ok(SerialPort::Serial(std::io::BufWriter::new(port)))
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ClientArgs {
    /// Wait this long for each response, in milliseconds.
    #[arg(long, default_value_t = 50)]
    retry_interval: u64,
    /// Send a read this many times before giving up.
    #[arg(long, default_value_t = 4)]
    attempts: u32,
    /// How long a command may take, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    command_timeout: u64,
}

impl ClientArgs {
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_retry(RetryPolicy::new(
                Duration::from_millis(self.retry_interval),
                self.attempts,
            ))
            .with_command_timeout(Duration::from_millis(self.command_timeout))
    }
}

/// A register named on the command line.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub address: u8,
    pub hidden: bool,
    pub descriptor: Option<&'static RegisterDescriptor>,
}

impl Target {
    /// Accepts a register name, or an address like `0x55` or `85`.
    pub fn resolve(directory: &RegisterDirectory, name: &str, hidden: bool) -> anyhow::Result<Self> {
        if let Some(number) = parse_number(name) {
            let address = u8::try_from(number)
                .map_err(|_| anyhow::anyhow!("address {:#x} out of range", number))?;
            return Ok(Self::at(directory, address, hidden));
        }

        let reg = directory
            .lookup(name)
            .ok_or_else(|| anyhow::anyhow!("unknown register: {}", name))?;
        Ok(Self {
            address: reg.address,
            hidden: reg.is_hidden(),
            descriptor: Some(reg),
        })
    }

    pub fn at(directory: &RegisterDirectory, address: u8, hidden: bool) -> Self {
        Self {
            address,
            hidden,
            descriptor: directory.lookup_address(RegisterSpace::from_hidden(hidden), address),
        }
    }

    pub fn name(&self) -> String {
        match self.descriptor {
            Some(reg) => reg.name.to_owned(),
            None if self.hidden => format!("hidden {:#04x}", self.address),
            None => format!("{:#04x}", self.address),
        }
    }
}

/// Parse `0x` hex, `0b` binary, or decimal.
pub fn parse_number(s: &str) -> Option<u32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = s.strip_prefix("0b") {
        u32::from_str_radix(bin, 2).ok()
    } else {
        s.parse().ok()
    }
}

pub fn print_fields(payload: [u8; 4], target: &Target) {
    let word = u32::from_be_bytes(payload);
    println!("{} = {:#010x}", target.name(), word);

    let Some(reg) = target.descriptor else {
        return;
    };
    let fields: Vec<(&str, FieldValue)> = reg.decode(word);
    let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in fields {
        println!("  {:width$}  {}", name, value, width = width);
    }
}

pub fn confirm(prompt: &str, yes: bool) -> anyhow::Result<()> {
    if yes {
        return Ok(());
    }

    if dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?
    {
        Ok(())
    } else {
        anyhow::bail!("cancelled")
    }
}

pub fn capture_bar(size: u64) -> anyhow::Result<indicatif::ProgressBar> {
    let bar = indicatif::ProgressBar::new(size);
    bar.set_style(
        indicatif::ProgressStyle::with_template(
            "({spinner}) [{wide_bar}] ({bytes}/{total_bytes}, {bytes_per_sec:>12})",
        )?
        .progress_chars("=> ")
        .tick_strings(&["<<<  ", "<<  <", "<  <<", "  <<<", " <<< ", "-----"]),
    );
    Ok(bar)
}
