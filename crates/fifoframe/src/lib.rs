//! Framed message exchange over a pair of named pipes.
//!
//! One process writes length-prefixed frames into a FIFO; the other polls it
//! without blocking and reassembles complete messages from whatever chunks
//! arrive.
//!
//! # Crate Structure
//!
//! - [`transport`]: FIFO endpoints and the zero-timeout channel poller
//! - [`frame`]: wire codec, reassembly state machine, send path and driver loop
//!
//! # Example
//!
//! ```no_run
//! use fifoframe::frame::{FrameConfig, FrameWriter, Receiver};
//!
//! # fn main() -> fifoframe::frame::Result<()> {
//! let config = FrameConfig::default();
//! let mut receiver = Receiver::open("/tmp/pyfifo", &config)?;
//! let mut handler = |payload: &[u8]| println!("got {} bytes", payload.len());
//! receiver.poll_once(&mut handler)?;
//!
//! let mut writer = FrameWriter::open("/tmp/cfifo", config.framing)?;
//! writer.send(b"hello")?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use fifoframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fifoframe_frame::*;
}
