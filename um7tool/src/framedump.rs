use um7lib::protocol::{self, Frame, TelemetryPacket};
use um7lib::registers::RegisterSpace;
use um7lib::RegisterDirectory;

const WIDTH: usize = 0x10;

pub fn printable(chr: u8) -> Option<char> {
    if (0x20..0x7f).contains(&chr) {
        Some(chr as char)
    } else {
        None
    }
}

/// One line of a hex dump.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexLine<'a> {
    offset: usize,
    data: &'a [u8],
}

impl<'a> std::fmt::Display for HexLine<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:04x}", self.offset)?;

        for i in 0..WIDTH {
            if i % 8 == 0 {
                write!(f, " ")?;
            }
            match self.data.get(i) {
                Some(b) => write!(f, " {:02x}", b)?,
                None => write!(f, "   ")?,
            }
        }

        write!(f, "  |")?;
        for b in self.data {
            write!(f, "{}", printable(*b).unwrap_or('.'))?;
        }
        write!(f, "|")
    }
}

pub fn hex_lines(data: &[u8]) -> impl Iterator<Item = HexLine<'_>> {
    data.chunks(WIDTH).enumerate().map(|(i, data)| HexLine {
        offset: i * WIDTH,
        data,
    })
}

pub fn hexdump_prefix(prefix: &str, data: &[u8]) {
    for line in hex_lines(data) {
        println!("{}{}", prefix, line);
    }
}

/// A one-line summary of a frame: its type bits, address, and register.
pub struct FrameSummary<'a, 'b> {
    frame: Frame<'a>,
    directory: &'b RegisterDirectory,
}

impl<'a, 'b> FrameSummary<'a, 'b> {
    pub fn new(bytes: &'a [u8], directory: &'b RegisterDirectory) -> Self {
        Self {
            frame: Frame::new(bytes),
            directory,
        }
    }
}

impl<'a, 'b> std::fmt::Display for FrameSummary<'a, 'b> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let typ = self.frame.packet_type();
        let space = RegisterSpace::from_hidden(typ.hidden);
        let name = self
            .directory
            .lookup_address(space, self.frame.address())
            .map(|r| r.name)
            .unwrap_or("?");

        write!(f, "{:#04x} {}", self.frame.address(), name)?;
        if typ.hidden {
            write!(f, " hidden")?;
        }
        if typ.is_batch {
            write!(f, " batch of {}", typ.batch_length)?;
        }
        if !typ.has_data {
            write!(f, " no data")?;
        }
        if typ.command_failed {
            write!(f, " FAILED")?;
        }
        write!(f, ", {} bytes", self.frame.len())?;
        if !protocol::verify_checksum(&self.frame) {
            write!(f, ", bad checksum")?;
        }
        Ok(())
    }
}

/// Print a received frame, decoded as far as it goes.
pub fn print_frame(prefix: &str, bytes: &[u8], directory: &RegisterDirectory) {
    println!("{} {}", prefix, FrameSummary::new(bytes, directory));

    let frame = Frame::new(bytes);
    if let Err(e) = protocol::check_structure(&frame) {
        println!("{}   {}", prefix, e);
    }

    match TelemetryPacket::decode(&frame) {
        Ok(packet) => println!("{}   {:?}", prefix, packet),
        Err(_) => {
            let payload = frame.raw_payload();
            if !payload.is_empty() {
                hexdump_prefix(&format!("{}   ", prefix), payload);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_line() {
        let line = hex_lines(b"snp\x00\x00\x01\x51").next().unwrap();
        assert_eq!(
            line.to_string(),
            format!("0000  73 6e 70 00 00 01 51{}|snp...Q|", " ".repeat(30))
        );
    }

    #[test]
    fn summary() {
        let dir = RegisterDirectory::um7();
        let frame = protocol::build_request_frame(0x80, 0x55, &[0; 4]);
        assert_eq!(
            FrameSummary::new(&frame, &dir).to_string(),
            "0x55 DREG_HEALTH, 11 bytes"
        );

        let frame = protocol::build_request_frame(0x01, 0xab, &[]);
        assert_eq!(
            FrameSummary::new(&frame, &dir).to_string(),
            "0xab FLASH_COMMIT no data FAILED, 7 bytes"
        );
    }
}
