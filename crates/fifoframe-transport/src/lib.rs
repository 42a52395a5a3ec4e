//! Named-pipe transport for fifoframe.
//!
//! Provides the two byte channels a fifoframe session runs over:
//! - an inbound FIFO opened for non-blocking reads, polled with a zero timeout
//! - an outbound FIFO opened for blocking writes
//!
//! This is the lowest layer of fifoframe. The reassembly logic in
//! `fifoframe-frame` only ever sees the [`PollOutcome`] values produced here.

pub mod error;
pub mod poller;

#[cfg(unix)]
pub mod fifo;

pub use error::{Result, TransportError};
pub use poller::{ChannelPoller, PollOutcome, DEFAULT_CHUNK_SIZE};

#[cfg(unix)]
pub use fifo::{create_fifo, FifoReader, FifoWriter, DEFAULT_FIFO_MODE};
