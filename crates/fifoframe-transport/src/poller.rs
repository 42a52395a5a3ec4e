use bytes::Bytes;

use crate::error::Result;

/// Default upper bound for a single channel read.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Result of one non-blocking poll of an inbound channel.
///
/// Faults are reported through the `Err` arm of [`ChannelPoller::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Bytes arrived. May be shorter than the configured chunk size.
    Ready(Bytes),
    /// Nothing to read right now.
    NotReady,
    /// The writer side closed the channel (zero-length read).
    Closed,
}

impl PollOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, PollOutcome::Closed)
    }
}

/// A single inbound byte channel that can be polled without blocking.
pub trait ChannelPoller {
    /// Check readiness with zero wait and, if ready, perform one bounded read.
    fn poll(&mut self) -> Result<PollOutcome>;

    /// Close and reopen the channel after [`PollOutcome::Closed`].
    fn reopen(&mut self) -> Result<()>;
}

impl<P: ChannelPoller + ?Sized> ChannelPoller for &mut P {
    fn poll(&mut self) -> Result<PollOutcome> {
        (**self).poll()
    }

    fn reopen(&mut self) -> Result<()> {
        (**self).reopen()
    }
}
