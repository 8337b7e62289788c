use crate::common::{print_fields, Target};

#[derive(clap::Args, Debug)]
pub struct ReadOpts {
    /// Register name, or address like 0x55.
    register: String,
    /// Treat a numeric address as a hidden register.
    #[arg(long)]
    hidden: bool,
    /// Read this many consecutive registers in one batch.
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u8,
    /// Print raw bytes only.
    #[arg(long)]
    raw: bool,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    client: crate::common::ClientArgs,
    #[command(flatten)]
    dump: crate::debug::DumpArgs,
}

impl crate::ToolRun for ReadOpts {
    fn run(&self) -> anyhow::Result<()> {
        let mut client = crate::debug::connect(&self.port, &self.client, &self.dump)?;
        let directory = client.directory().clone();
        let target = Target::resolve(&directory, &self.register, self.hidden)?;

        let data = if self.count > 1 {
            client.read_batch(target.address, self.count, target.hidden)?
        } else {
            client.read_register(target.address, target.hidden)?.to_vec()
        };

        for (i, chunk) in data.chunks_exact(4).enumerate() {
            let address = target.address.wrapping_add(i as u8);
            let here = Target::at(&directory, address, target.hidden);
            let payload = [chunk[0], chunk[1], chunk[2], chunk[3]];

            if self.raw {
                println!("{} = {:02x?}", here.name(), payload);
            } else {
                print_fields(payload, &here);
            }
        }

        log::debug!("{:?}", client.stats());
        Ok(())
    }
}
