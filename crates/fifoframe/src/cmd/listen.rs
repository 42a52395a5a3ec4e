use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fifoframe_frame::{FrameConfig, Framing, Receiver};
use fifoframe_transport::{create_fifo, DEFAULT_FIFO_MODE};
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let framing = Framing::from(args.framing);
    let idle_interval = parse_duration(&args.poll_interval)?;
    if args.chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }

    if args.create {
        create_fifo(&args.path, DEFAULT_FIFO_MODE)
            .map_err(|err| transport_error("create failed", err))?;
    }

    let config = FrameConfig {
        framing,
        read_chunk_size: args.chunk_size,
        ..FrameConfig::default()
    };
    let mut receiver =
        Receiver::open(&args.path, &config).map_err(|err| frame_error("open failed", err))?;
    info!(path = %args.path.display(), framing = framing.name(), "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let limit = args.count.unwrap_or(usize::MAX);
    let received = Cell::new(0usize);
    let mut handler = |payload: &[u8]| {
        if received.get() >= limit {
            return;
        }
        received.set(received.get() + 1);
        print_message(received.get(), payload, framing.name(), format);
    };

    receiver
        .run(
            &mut handler,
            || running.load(Ordering::SeqCst) && received.get() < limit,
            Some(idle_interval),
        )
        .map_err(|err| frame_error("receive failed", err))?;

    info!(
        messages = received.get(),
        resets = receiver.resets(),
        "listener stopped"
    );
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
