use std::io::{Read, Write};
use std::time::{Duration, Instant};

#[derive(clap::Args, Debug)]
pub struct CaptureOpts {
    /// File to write raw bytes to.
    output: String,
    /// Stop after this many bytes.
    #[arg(short, long, default_value_t = 0x10000)]
    size: u64,
    /// Stop after this many seconds, even if short of --size.
    #[arg(short, long)]
    time: Option<u64>,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
}

impl crate::ToolRun for CaptureOpts {
    fn run(&self) -> anyhow::Result<()> {
        let mut port = self.port.open()?;
        let mut output = std::io::BufWriter::new(std::fs::File::create(&self.output)?);
        let deadline = self.time.map(|t| Instant::now() + Duration::from_secs(t));

        let bar = crate::common::capture_bar(self.size)?;
        let mut buf = [0; 256];
        let mut total = 0;

        while total < self.size {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }

            let want = buf.len().min((self.size - total) as usize);
            match port.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(amt) => {
                    output.write_all(&buf[..amt])?;
                    total += amt as u64;
                    bar.set_position(total);
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        bar.finish();
        output.flush()?;
        eprintln!("Captured {} bytes to {}.", total, self.output);
        Ok(())
    }
}
