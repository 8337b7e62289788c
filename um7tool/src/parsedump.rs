use um7lib::protocol;
use um7lib::RegisterDirectory;

use crate::debug::Direction;
use crate::framedump::{hexdump_prefix, print_frame};

#[derive(clap::Args, Debug)]
pub struct ParseDumpOpts {
    dump: String,
    /// The file is raw sensor output from `capture`, not a --dump record.
    #[arg(long)]
    raw: bool,
}

impl crate::ToolRun for ParseDumpOpts {
    fn run(&self) -> anyhow::Result<()> {
        let rawdata = std::fs::read(&self.dump)?;
        let directory = RegisterDirectory::um7();

        if self.raw {
            let mut stream = rawdata;
            let count = drain_frames(Direction::Device, &mut stream, &directory);
            finish(Direction::Device, &stream);
            eprintln!("{} frames.", count);
            return Ok(());
        }

        // one reassembly buffer per direction
        let mut streams = [Vec::new(), Vec::new()];
        let mut count = 0;
        let mut raw = &rawdata[..];
        while raw.len() >= 3 {
            let direction = Direction::from_u8(raw[0])
                .ok_or_else(|| anyhow::anyhow!("bad direction byte {:#04x}", raw[0]))?;
            let len = u16::from_be_bytes([raw[1], raw[2]]) as usize;
            anyhow::ensure!(raw.len() >= 3 + len, "dump ends in the middle of a record");

            let stream = &mut streams[direction as usize];
            stream.extend_from_slice(&raw[3..3 + len]);
            raw = &raw[3 + len..];

            count += drain_frames(direction, stream, &directory);
        }

        finish(Direction::Device, &streams[Direction::Device as usize]);
        finish(Direction::Host, &streams[Direction::Host as usize]);
        eprintln!("{} frames.", count);
        Ok(())
    }
}

/// Print and remove every complete frame at the front of `stream`.
fn drain_frames(direction: Direction, stream: &mut Vec<u8>, directory: &RegisterDirectory) -> usize {
    let mut count = 0;
    loop {
        let (frame, rest) = protocol::extract_next_frame(stream);
        let Some(frame) = frame else {
            break;
        };
        print_frame(direction.arrow(), frame, directory);
        println!();

        let consumed = stream.len() - rest.len();
        stream.drain(..consumed);
        count += 1;
    }
    count
}

fn finish(direction: Direction, leftover: &[u8]) {
    if !leftover.is_empty() {
        println!("{} {} bytes left over:", direction.arrow(), leftover.len());
        hexdump_prefix(&format!("{}   ", direction.arrow()), leftover);
    }
}
