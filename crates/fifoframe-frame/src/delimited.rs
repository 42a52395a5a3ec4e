//! NUL-delimited message reassembly.
//!
//! Older peers terminate each message with a single `0x00` byte instead of
//! prefixing a length. There is no header to parse: the reassembler scans for
//! the terminator and delivers everything before it. Payloads cannot contain
//! `0x00`.

use tracing::debug;

use crate::buffer::GrowableBuffer;
use crate::codec::{DEFAULT_MIN_BUFFER_CAPACITY, NUL_TERMINATOR};
use crate::error::Result;
use crate::reassembler::{MessageHandler, Reassemble};

/// Reassembler for NUL-terminated messages.
#[derive(Debug)]
pub struct DelimitedReassembler {
    min_capacity: usize,
    intake: GrowableBuffer,
    /// Prefix of `intake` already known to hold no terminator.
    scanned: usize,
}

impl Default for DelimitedReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimitedReassembler {
    pub fn new() -> Self {
        Self::with_min_capacity(DEFAULT_MIN_BUFFER_CAPACITY)
    }

    pub fn with_min_capacity(min_capacity: usize) -> Self {
        Self {
            min_capacity,
            intake: GrowableBuffer::new(),
            scanned: 0,
        }
    }

    /// Bytes buffered after the last terminator.
    pub fn buffered_len(&self) -> usize {
        self.intake.len()
    }

    pub fn intake_capacity(&self) -> usize {
        self.intake.capacity()
    }

    /// Buffer `chunk` and deliver every message it terminates.
    pub fn ingest<H: MessageHandler + ?Sized>(
        &mut self,
        chunk: &[u8],
        handler: &mut H,
    ) -> Result<usize> {
        if let Err(err) = self.intake.append(chunk) {
            self.reset();
            return Err(err);
        }

        let mut delivered = 0usize;
        while let Some(pos) = self.intake.as_slice()[self.scanned..]
            .iter()
            .position(|&b| b == NUL_TERMINATOR)
        {
            let end = self.scanned + pos;
            handler.on_message(&self.intake.as_slice()[..end]);
            self.intake.consume(end + 1);
            self.scanned = 0;
            delivered += 1;
        }
        self.scanned = self.intake.len();

        self.intake.shrink(self.min_capacity);
        debug!(
            bytes = chunk.len(),
            delivered,
            buffered = self.intake.len(),
            "ingested chunk"
        );
        Ok(delivered)
    }

    /// Free the buffer and forget any unterminated bytes.
    pub fn reset(&mut self) {
        if !self.intake.is_empty() {
            debug!(discarded = self.intake.len(), "discarding unterminated message");
        }
        self.intake.release();
        self.scanned = 0;
    }
}

impl Reassemble for DelimitedReassembler {
    fn ingest(&mut self, chunk: &[u8], handler: &mut dyn MessageHandler) -> Result<usize> {
        DelimitedReassembler::ingest(self, chunk, handler)
    }

    fn reset(&mut self) {
        DelimitedReassembler::reset(self)
    }
}
