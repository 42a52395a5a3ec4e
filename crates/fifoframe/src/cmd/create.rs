use fifoframe_transport::create_fifo;

use crate::cmd::CreateArgs;
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: CreateArgs) -> CliResult<i32> {
    let mode = parse_mode(&args.mode)?;
    for path in &args.paths {
        create_fifo(path, mode)
            .map_err(|err| transport_error(&format!("create {} failed", path.display()), err))?;
    }
    Ok(SUCCESS)
}

fn parse_mode(input: &str) -> CliResult<u32> {
    let digits = input.trim().trim_start_matches("0o");
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| CliError::new(USAGE, format!("invalid octal mode: {input}")))?;
    if mode > 0o777 {
        return Err(CliError::new(USAGE, format!("mode out of range: {input}")));
    }
    Ok(mode)
}
