use std::path::PathBuf;

/// Errors that can occur on a FIFO channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create the FIFO node.
    #[error("failed to create fifo {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open (or reopen) the FIFO.
    #[error("failed to open fifo {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The zero-timeout readiness check failed.
    #[error("readiness poll failed: {0}")]
    Poll(std::io::Error),

    /// A read from a channel reported ready failed.
    #[error("fifo read failed: {0}")]
    Read(std::io::Error),

    /// The path exists but is not a FIFO.
    #[error("existing path is not a fifo: {path}")]
    NotAFifo { path: PathBuf },

    /// Any other I/O error on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
