use rustyline::{error::ReadlineError, DefaultEditor};

use um7lib::RegisterValue;

use crate::common::{parse_number, print_fields, Target};
use crate::debug::ToolClient;

const HELP: &str = "\
read <register> [hidden]          read and decode a register
write <register> <value>          write an integer, or a float with a '.'
field <register> <field> <value>  change one field of a register
cmd <name>                        run a command register
fw                                print the firmware revision
regs [filter]                     list registers
stats                             show traffic counters
quit                              leave";

#[derive(clap::Args, Debug)]
pub struct ConsoleOpts {
    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    client: crate::common::ClientArgs,
    #[command(flatten)]
    dump: crate::debug::DumpArgs,
}

impl crate::ToolRun for ConsoleOpts {
    fn run(&self) -> anyhow::Result<()> {
        let client = crate::debug::connect(&self.port, &self.client, &self.dump)?;
        Console::new(client).run()
    }
}

pub struct Console {
    client: ToolClient,
}

impl Console {
    pub fn new(client: ToolClient) -> Self {
        Self { client }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;
        eprintln!("Type `help` for commands.");

        loop {
            match rl.readline("um7> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line)?;

                    match self.handle(line) {
                        Ok(true) => return Ok(()),
                        Ok(false) => {}
                        Err(e) => eprintln!("!!! {}", e),
                    }
                }

                Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return Ok(()),

                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run one line. Returns true to quit.
    fn handle(&mut self, line: &str) -> anyhow::Result<bool> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let directory = self.client.directory().clone();

        match words.as_slice() {
            ["help"] | ["?"] => println!("{}", HELP),
            ["quit"] | ["exit"] => return Ok(true),

            ["read", name, rest @ ..] => {
                let hidden = rest.contains(&"hidden");
                let target = Target::resolve(&directory, name, hidden)?;
                let payload = self.client.read_register(target.address, target.hidden)?;
                print_fields(payload, &target);
            }

            ["write", name, value] => {
                let target = Target::resolve(&directory, name, false)?;
                let value = if value.contains('.') {
                    RegisterValue::F32(value.parse()?)
                } else if let Some(v) = parse_number(value) {
                    RegisterValue::U32(v)
                } else {
                    RegisterValue::from(value.parse::<i32>()?)
                };
                self.client
                    .write_register(target.address, value, target.hidden)?;
                println!("ok");
            }

            ["field", name, field, value] => {
                let reg = self.client.lookup(name)?;
                let f = reg
                    .field(field)
                    .ok_or_else(|| anyhow::anyhow!("{} has no field {}", reg.name, field))?;
                let raw = match f.value_of(value) {
                    Some(raw) => raw,
                    None => parse_number(value)
                        .ok_or_else(|| anyhow::anyhow!("bad value: {}", value))?,
                };
                self.client.write_field(reg.name, f.name, raw)?;
                println!("ok");
            }

            ["cmd", name] => {
                self.client.command(name)?;
                println!("ok");
            }

            ["fw"] => println!("{}", self.client.firmware_revision()?),

            ["regs", filter @ ..] => {
                let filter = filter.first().map(|f| f.to_ascii_uppercase());
                for reg in directory.iter() {
                    if filter.as_ref().map_or(true, |f| reg.name.contains(f.as_str())) {
                        println!("{:#04x} {:<10} {}", reg.address, reg.access.to_string(), reg.name);
                    }
                }
            }

            ["stats"] => println!("{:#?}", self.client.stats()),

            _ => eprintln!("unknown command, try `help`"),
        }

        Ok(false)
    }
}
