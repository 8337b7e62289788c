#[derive(clap::Args, Debug)]
pub struct PortsOpts {
    /// Show every USB serial port, not only FTDI ones.
    #[arg(short, long)]
    all: bool,
}

impl crate::ToolRun for PortsOpts {
    fn run(&self) -> anyhow::Result<()> {
        let ports = crate::common::usb_ports();
        let mut found = false;

        for (name, usb) in ports {
            if !self.all && usb.vid != crate::common::FTDI_VID {
                continue;
            }
            found = true;

            println!(
                "{}  {:04x}:{:04x}  serial {}  {}",
                name,
                usb.vid,
                usb.pid,
                usb.serial_number.as_deref().unwrap_or("-"),
                usb.manufacturer.as_deref().unwrap_or(""),
            );
        }

        if !found {
            eprintln!("No matching ports found.");
        }
        Ok(())
    }
}
