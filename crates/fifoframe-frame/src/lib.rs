//! Length-prefixed message framing and incremental reassembly for FIFO IPC.
//!
//! Every message on the wire is a fixed-width length header followed by
//! exactly that many payload bytes:
//! - 1-byte header: payloads up to 255 bytes
//! - 2-byte big-endian header: payloads up to 65535 bytes
//!
//! Bytes arrive from a polled channel in arbitrary chunks. The [`Reassembler`]
//! buffers them and hands each complete message to a [`MessageHandler`]
//! exactly once, in arrival order. A NUL-delimited variant is provided by
//! [`DelimitedReassembler`] for peers that speak that dialect.

pub mod buffer;
pub mod codec;
pub mod delimited;
pub mod error;
pub mod reassembler;
pub mod receiver;
pub mod writer;

pub use buffer::GrowableBuffer;
pub use codec::{
    encode_frame, EncodedHeader, FrameConfig, Framing, HeaderWidth, DEFAULT_MIN_BUFFER_CAPACITY,
    DEFAULT_READ_CHUNK_SIZE, NUL_TERMINATOR,
};
pub use delimited::DelimitedReassembler;
pub use error::{FrameError, Result};
pub use reassembler::{reassembler_for, MessageHandler, Reassemble, Reassembler, State};
pub use receiver::{Receiver, Tick};
pub use writer::FrameWriter;
