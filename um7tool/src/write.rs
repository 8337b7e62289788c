use um7lib::RegisterValue;

use crate::common::{parse_number, Target};

/// Registers that are too easy to regret writing.
const CONFIRM: &[&str] = &["CREG_COM_SETTINGS"];

#[derive(clap::Args, Debug)]
pub struct WriteOpts {
    /// Register name, or address like 0x01.
    register: String,
    /// Integer, float with --float, or hex bytes with --hex-bytes.
    value: String,
    /// Write only this field, leaving the rest of the register alone.
    #[arg(short, long)]
    field: Option<String>,
    /// Treat a numeric address as a hidden register.
    #[arg(long)]
    hidden: bool,
    /// Send the value as a float.
    #[arg(long, conflicts_with_all = ["hex_bytes", "field"])]
    float: bool,
    /// Send the value as hex bytes, a multiple of 4 long.
    #[arg(long, conflicts_with = "field")]
    hex_bytes: bool,
    #[arg(short, long)]
    yes: bool,

    #[command(flatten)]
    port: crate::common::SerialPortArgs,
    #[command(flatten)]
    client: crate::common::ClientArgs,
    #[command(flatten)]
    dump: crate::debug::DumpArgs,
}

impl WriteOpts {
    fn value(&self) -> anyhow::Result<RegisterValue> {
        if self.float {
            return Ok(RegisterValue::F32(self.value.parse()?));
        }

        if self.hex_bytes {
            return Ok(RegisterValue::Bytes(parse_hex_bytes(&self.value)?));
        }

        if let Some(v) = parse_number(&self.value) {
            Ok(RegisterValue::U32(v))
        } else {
            // negative integers go out as two's complement
            let v: i32 = self.value.parse()?;
            Ok(v.into())
        }
    }
}

/// Parse hex digit pairs, ignoring whitespace.
fn parse_hex_bytes(s: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    anyhow::ensure!(digits.is_ascii(), "not a hex string: {}", s);
    anyhow::ensure!(digits.len() % 2 == 0, "odd number of hex digits");
    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(bytes)
}

impl crate::ToolRun for WriteOpts {
    fn run(&self) -> anyhow::Result<()> {
        let mut client = crate::debug::connect(&self.port, &self.client, &self.dump)?;
        let directory = client.directory().clone();
        let target = Target::resolve(&directory, &self.register, self.hidden)?;

        if let Some(reg) = target.descriptor {
            if CONFIRM.contains(&reg.name) {
                eprintln!("Writing {} can make the sensor stop answering at this baud rate.", reg.name);
                crate::common::confirm("Continue?", self.yes)?;
            }
        }

        if let Some(ref field_name) = self.field {
            let reg = target
                .descriptor
                .ok_or_else(|| anyhow::anyhow!("{} has no known fields", target.name()))?;
            let field = reg
                .field(field_name)
                .ok_or_else(|| anyhow::anyhow!("{} has no field {}", reg.name, field_name))?;

            // enumerated fields accept their value names too
            let raw = match field.value_of(&self.value) {
                Some(raw) => raw,
                None => parse_number(&self.value)
                    .ok_or_else(|| anyhow::anyhow!("bad value for {}: {}", field.name, self.value))?,
            };
            client.write_field(reg.name, field.name, raw)?;
            eprintln!("Wrote {}.{} = {}", reg.name, field.name, raw);
        } else {
            let value = self.value()?;
            client.write_register(target.address, value.clone(), target.hidden)?;
            eprintln!("Wrote {} = {:?}", target.name(), value);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_bytes() {
        assert_eq!(parse_hex_bytes("0102a0FF").unwrap(), [0x01, 0x02, 0xa0, 0xff]);
        assert_eq!(parse_hex_bytes("de ad\tbe ef").unwrap(), [0xde, 0xad, 0xbe, 0xef]);
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn hex_bytes_non_ascii() {
        assert!(parse_hex_bytes("aéb").is_err());
        assert!(parse_hex_bytes("éé").is_err());
    }
}
