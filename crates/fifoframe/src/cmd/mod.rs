use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use fifoframe_frame::{Framing, HeaderWidth, DEFAULT_READ_CHUNK_SIZE};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod create;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create FIFO nodes.
    Create(CreateArgs),
    /// Poll an inbound FIFO and print reassembled messages.
    Listen(ListenArgs),
    /// Send a single framed message.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Create(args) => create::run(args),
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Wire framing selectable on the command line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FramingArg {
    /// 1-byte length header (payloads up to 255 bytes).
    U8,
    /// 2-byte big-endian length header (payloads up to 65535 bytes).
    #[default]
    U16,
    /// NUL-terminated messages.
    Nul,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::U8 => Framing::LengthPrefixed(HeaderWidth::One),
            FramingArg::U16 => Framing::LengthPrefixed(HeaderWidth::Two),
            FramingArg::Nul => Framing::NulDelimited,
        }
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// FIFO paths to create. Existing FIFOs are left as they are.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Permission bits in octal.
    #[arg(long, default_value = "600")]
    pub mode: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Inbound FIFO path.
    pub path: PathBuf,
    /// Wire framing.
    #[arg(long, value_enum, env = "FIFOFRAME_FRAMING", default_value = "u16")]
    pub framing: FramingArg,
    /// Create the FIFO if it does not exist.
    #[arg(long)]
    pub create: bool,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Sleep between idle polls (e.g. 1ms, 50ms, 1s).
    #[arg(long, env = "FIFOFRAME_POLL_INTERVAL", default_value = "1ms")]
    pub poll_interval: String,
    /// Maximum bytes read per poll.
    #[arg(long, env = "FIFOFRAME_CHUNK_SIZE", default_value_t = DEFAULT_READ_CHUNK_SIZE)]
    pub chunk_size: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Outbound FIFO path. Opening blocks until a reader is present.
    pub path: PathBuf,
    /// Wire framing.
    #[arg(long, value_enum, env = "FIFOFRAME_FRAMING", default_value = "u16")]
    pub framing: FramingArg,
    /// Create the FIFO if it does not exist.
    #[arg(long)]
    pub create: bool,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_millis(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn framing_arg_maps_to_wire_framing() {
        assert_eq!(
            Framing::from(FramingArg::U8),
            Framing::LengthPrefixed(HeaderWidth::One)
        );
        assert_eq!(Framing::from(FramingArg::default()), Framing::default());
        assert_eq!(Framing::from(FramingArg::Nul), Framing::NulDelimited);
    }
}
