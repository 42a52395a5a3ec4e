#[cfg(unix)]
use std::path::Path;
use std::time::Duration;

use fifoframe_transport::{ChannelPoller, PollOutcome};
#[cfg(unix)]
use fifoframe_transport::FifoReader;
use tracing::{error, info, trace};

use crate::codec::FrameConfig;
use crate::error::Result;
use crate::reassembler::{reassembler_for, MessageHandler, Reassemble};

/// What a single [`Receiver::poll_once`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The channel had nothing to read.
    Idle,
    /// A chunk was read and `delivered` messages were completed from it.
    Received { bytes: usize, delivered: usize },
    /// The writer closed the channel; state was discarded and the channel reopened.
    Reset,
}

/// Drives a [`ChannelPoller`] and feeds its bytes to a reassembler.
///
/// Single-threaded and non-blocking: each call to [`poll_once`](Self::poll_once)
/// performs at most one zero-timeout poll and one bounded read. A closed
/// channel is handled here and never surfaces as an error. Channel faults and
/// allocation failures are returned to the caller.
pub struct Receiver<P, R> {
    poller: P,
    reassembler: R,
    resets: u64,
}

impl<P: ChannelPoller, R: Reassemble> Receiver<P, R> {
    pub fn new(poller: P, reassembler: R) -> Self {
        Self {
            poller,
            reassembler,
            resets: 0,
        }
    }

    /// Poll once and deliver any messages the new bytes complete.
    pub fn poll_once(&mut self, handler: &mut dyn MessageHandler) -> Result<Tick> {
        match self.poller.poll()? {
            PollOutcome::NotReady => Ok(Tick::Idle),
            PollOutcome::Ready(chunk) => {
                let delivered = self.reassembler.ingest(&chunk, handler)?;
                trace!(bytes = chunk.len(), delivered, "poll tick");
                Ok(Tick::Received {
                    bytes: chunk.len(),
                    delivered,
                })
            }
            PollOutcome::Closed => {
                info!("writer closed channel, resetting and reopening");
                self.reassembler.reset();
                self.poller.reopen()?;
                self.resets += 1;
                Ok(Tick::Reset)
            }
        }
    }

    /// Poll until `keep_running` returns false or a fatal error occurs.
    ///
    /// `idle_interval`, when set, is slept after every idle tick.
    pub fn run(
        &mut self,
        handler: &mut dyn MessageHandler,
        mut keep_running: impl FnMut() -> bool,
        idle_interval: Option<Duration>,
    ) -> Result<()> {
        while keep_running() {
            match self.poll_once(handler) {
                Ok(Tick::Idle) => {
                    if let Some(interval) = idle_interval {
                        std::thread::sleep(interval);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    error!(%err, "receiver stopped");
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Number of peer-closed resets handled so far.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    pub fn poller(&self) -> &P {
        &self.poller
    }

    pub fn poller_mut(&mut self) -> &mut P {
        &mut self.poller
    }

    pub fn reassembler(&self) -> &R {
        &self.reassembler
    }

    /// Consume the receiver and return its parts.
    pub fn into_parts(self) -> (P, R) {
        (self.poller, self.reassembler)
    }
}

#[cfg(unix)]
impl Receiver<FifoReader, Box<dyn Reassemble>> {
    /// Open the inbound FIFO at `path` and pick a reassembler from `config`.
    pub fn open(path: impl AsRef<Path>, config: &FrameConfig) -> Result<Self> {
        let poller = FifoReader::with_chunk_size(path, config.read_chunk_size)?;
        Ok(Self::new(poller, reassembler_for(config)))
    }
}
