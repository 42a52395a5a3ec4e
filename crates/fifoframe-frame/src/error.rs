use fifoframe_transport::TransportError;

/// Errors that can occur while framing, sending or reassembling messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit in the header's representable range.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A NUL-delimited payload contains the terminator byte.
    #[error("payload contains a NUL terminator at offset {offset}")]
    EmbeddedTerminator { offset: usize },

    /// A reassembly buffer could not obtain memory.
    #[error("buffer allocation failed (requested {requested} bytes)")]
    Allocation { requested: usize },

    /// The underlying channel failed.
    #[error("channel fault: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error occurred while writing a frame.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel accepted only part of a frame.
    #[error("partial frame write ({written} of {expected} bytes)")]
    PartialWrite { written: usize, expected: usize },
}

impl FrameError {
    /// True when the payload was rejected before anything was written.
    pub fn is_protocol_limit(&self) -> bool {
        matches!(
            self,
            FrameError::PayloadTooLarge { .. } | FrameError::EmbeddedTerminator { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
