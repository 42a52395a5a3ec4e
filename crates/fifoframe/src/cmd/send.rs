use std::fs;

use fifoframe_frame::{Framing, FrameWriter};
use fifoframe_transport::{create_fifo, DEFAULT_FIFO_MODE};
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let framing = Framing::from(args.framing);
    let payload = resolve_payload(&args)?;

    // Opening the FIFO blocks until a reader shows up, so reject payloads
    // the framing cannot carry first.
    framing
        .check_payload(&payload)
        .map_err(|err| frame_error("send failed", err))?;

    if args.create {
        create_fifo(&args.path, DEFAULT_FIFO_MODE)
            .map_err(|err| transport_error("create failed", err))?;
    }

    debug!(path = %args.path.display(), framing = framing.name(), "waiting for reader");
    let mut writer =
        FrameWriter::open(&args.path, framing).map_err(|err| frame_error("open failed", err))?;
    let written = writer
        .send(&payload)
        .map_err(|err| frame_error("send failed", err))?;

    print_sent(&args.path, framing.name(), payload.len(), written, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(encoded) = &args.hex {
        return decode_hex(encoded);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn decode_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")))
}
