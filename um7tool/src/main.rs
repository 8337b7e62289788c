use clap::{Parser, Subcommand};

mod broadcast;
mod capture;
mod command;
mod common;
mod console;
mod debug;
mod framedump;
mod parsedump;
mod ports;
mod read;
mod registers;
mod simulate;
mod write;

trait ToolRun {
    fn run(&self) -> anyhow::Result<()>;
}

/// Talk to a UM7 orientation sensor.
#[derive(Parser, Debug)]
#[command(version, about)]
struct ToolOptions {
    /// Log more. Repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(Subcommand, Debug)]
enum ToolCommand {
    /// List serial ports that look like a UM7.
    Ports(ports::PortsOpts),
    /// List known registers.
    Registers(registers::RegistersOpts),
    /// Read a register and decode it.
    Read(read::ReadOpts),
    /// Write a register.
    Write(write::WriteOpts),
    /// Run a command register.
    Command(command::CommandOpts),
    /// Stream broadcast telemetry.
    Broadcast(broadcast::BroadcastOpts),
    /// Save raw bytes from the sensor to a file.
    Capture(capture::CaptureOpts),
    /// Decode a capture or traffic dump offline.
    ParseDump(parsedump::ParseDumpOpts),
    /// Interactive register console.
    Console(console::ConsoleOpts),
    /// Pretend to be a UM7 over TCP.
    Simulate(simulate::SimulateOpts),
}

impl ToolRun for ToolCommand {
    fn run(&self) -> anyhow::Result<()> {
        use ToolCommand::*;
        match self {
            Ports(o) => o.run(),
            Registers(o) => o.run(),
            Read(o) => o.run(),
            Write(o) => o.run(),
            Command(o) => o.run(),
            Broadcast(o) => o.run(),
            Capture(o) => o.run(),
            ParseDump(o) => o.run(),
            Console(o) => o.run(),
            Simulate(o) => o.run(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let opts = ToolOptions::parse();
    debug::init_logging(opts.debug)?;
    opts.command.run()
}
