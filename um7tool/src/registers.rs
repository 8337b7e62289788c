use um7lib::registers::{RegisterKind, RegisterSpace};
use um7lib::RegisterDirectory;

#[derive(clap::Args, Debug)]
pub struct RegistersOpts {
    /// Only show registers whose name contains this.
    filter: Option<String>,
    /// Also list each register's fields.
    #[arg(short, long)]
    fields: bool,
}

impl crate::ToolRun for RegistersOpts {
    fn run(&self) -> anyhow::Result<()> {
        let directory = RegisterDirectory::um7();
        let filter = self.filter.as_ref().map(|f| f.to_ascii_uppercase());

        for reg in directory.iter() {
            if let Some(ref filter) = filter {
                if !reg.name.contains(filter.as_str()) {
                    continue;
                }
            }

            let space = match reg.space {
                RegisterSpace::Main => "    ",
                RegisterSpace::Hidden => "hid ",
            };
            let kind = match reg.kind {
                RegisterKind::Config => "config ",
                RegisterKind::Data => "data   ",
                RegisterKind::Command => "command",
            };
            println!(
                "{:#04x} {}{} {:<10} {:<28} {}",
                reg.address,
                space,
                kind,
                reg.access.to_string(),
                reg.name,
                reg.description
            );

            if self.fields {
                for field in reg.fields {
                    println!(
                        "       [{:>2}:{:<2}] {:<24} {}",
                        field.msb, field.lsb, field.name, field.description
                    );
                    for value in field.values {
                        println!("                 {:>3} = {}", value.value, value.name);
                    }
                }
            }
        }
        Ok(())
    }
}
