use um7lib::protocol::{BroadcastKind, TelemetryPacket};
use um7lib::BroadcastOptions;

#[derive(clap::Args, Debug)]
pub struct BroadcastOpts {
    /// Stop after this many packets.
    #[arg(short = 'n', long)]
    count: Option<usize>,
    /// Only show packets of this kind, like `euler` or `health`.
    #[arg(short, long)]
    kind: Option<BroadcastKind>,
    /// Keep bytes received before streaming started.
    #[arg(long)]
    no_flush: bool,
    /// Count packets instead of printing them.
    #[arg(short, long)]
    quiet: bool,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    client: crate::common::ClientArgs,
    #[command(flatten)]
    dump: crate::debug::DumpArgs,
}

impl crate::ToolRun for BroadcastOpts {
    fn run(&self) -> anyhow::Result<()> {
        let mut client = crate::debug::connect(&self.port, &self.client, &self.dump)?;

        let mut options = BroadcastOptions::default().flush_on_start(!self.no_flush);
        if let Some(count) = self.count {
            options = options.num_packets(count);
        }
        if let Some(kind) = self.kind {
            options = options.kind(kind);
        }

        let spinner = self.quiet.then(indicatif::ProgressBar::new_spinner);
        for packet in client.broadcasts(options) {
            let packet = packet?;
            match spinner {
                Some(ref spinner) => {
                    spinner.inc(1);
                    spinner.set_message(packet.kind().to_string());
                }
                None => print_packet(&packet),
            }
        }

        if let Some(spinner) = spinner {
            spinner.finish();
        }
        log::info!("{:?}", client.stats());
        Ok(())
    }
}

fn print_packet(packet: &TelemetryPacket) {
    match packet {
        TelemetryPacket::Euler(e) => println!(
            "euler: roll {:8.3} pitch {:8.3} yaw {:8.3}  rates {:8.3} {:8.3} {:8.3}  t {:.3}",
            e.roll, e.pitch, e.yaw, e.roll_rate, e.pitch_rate, e.yaw_rate, e.time
        ),
        TelemetryPacket::Quaternion(q) => println!(
            "quaternion: {:8.5} {:8.5} {:8.5} {:8.5}  t {:.3}",
            q.a, q.b, q.c, q.d, q.time
        ),
        TelemetryPacket::Health(h) => println!(
            "health: {:#010x}  sats {}/{}  hdop {}{}{}{}{}{}",
            h.health,
            h.sats_used(),
            h.sats_in_view(),
            h.hdop(),
            if h.gyro_failed() { "  GYRO" } else { "" },
            if h.accel_failed() { "  ACCEL" } else { "" },
            if h.mag_failed() { "  MAG" } else { "" },
            if h.gps_failed() { "  GPS" } else { "" },
            if h.overflow() { "  OVF" } else { "" },
        ),
        other => println!("{}: {:?}", other.kind(), other),
    }
}
