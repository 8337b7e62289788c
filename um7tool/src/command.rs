use um7lib::registers::RegisterKind;

/// Commands that change what the sensor keeps across power cycles.
const DANGEROUS: &[&str] = &["FLASH_COMMIT", "RESET_TO_FACTORY"];

#[derive(clap::Args, Debug)]
pub struct CommandOpts {
    /// Command register name, like ZERO_GYROS.
    name: String,
    #[arg(short, long)]
    yes: bool,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    client: crate::common::ClientArgs,
    #[command(flatten)]
    dump: crate::debug::DumpArgs,
}

impl crate::ToolRun for CommandOpts {
    fn run(&self) -> anyhow::Result<()> {
        let mut client = crate::debug::connect(&self.port, &self.client, &self.dump)?;
        let reg = client.lookup(&self.name)?;
        if reg.kind != RegisterKind::Command {
            anyhow::bail!("{} is not a command", reg.name);
        }

        // the one command that answers with data
        if reg.access.can_read() {
            println!("{}", client.firmware_revision()?);
            return Ok(());
        }

        if DANGEROUS.contains(&reg.name) {
            crate::common::confirm(&format!("Really run {}?", reg.name), self.yes)?;
        }

        eprintln!("Running {}...", reg.name);
        client.execute_command(reg.address)?;
        eprintln!("Done.");
        Ok(())
    }
}
