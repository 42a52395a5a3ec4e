use tracing::{debug, trace};

use crate::buffer::GrowableBuffer;
use crate::codec::{FrameConfig, Framing, HeaderWidth, DEFAULT_MIN_BUFFER_CAPACITY};
use crate::delimited::DelimitedReassembler;
use crate::error::Result;

/// Receives each complete message.
///
/// The payload slice is only valid for the duration of the call; the
/// reassembler reuses its buffers afterwards. Handlers run inside
/// [`Reassemble::ingest`] and delay any later message in the same chunk, so
/// they should not block.
pub trait MessageHandler {
    fn on_message(&mut self, payload: &[u8]);
}

impl<F: FnMut(&[u8])> MessageHandler for F {
    fn on_message(&mut self, payload: &[u8]) {
        self(payload)
    }
}

/// Turns arbitrarily chunked bytes into complete messages.
pub trait Reassemble {
    /// Buffer `chunk` and deliver every message it completes, in order.
    ///
    /// Returns the number of messages delivered. An error is fatal for the
    /// current session: the reassembler has already been reset and any
    /// partial message is gone.
    fn ingest(&mut self, chunk: &[u8], handler: &mut dyn MessageHandler) -> Result<usize>;

    /// Drop all buffered bytes and any partial message.
    fn reset(&mut self);
}

impl<R: Reassemble + ?Sized> Reassemble for Box<R> {
    fn ingest(&mut self, chunk: &[u8], handler: &mut dyn MessageHandler) -> Result<usize> {
        (**self).ingest(chunk, handler)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Build the reassembler matching `config.framing`.
pub fn reassembler_for(config: &FrameConfig) -> Box<dyn Reassemble> {
    match config.framing {
        Framing::LengthPrefixed(width) => Box::new(Reassembler::with_min_capacity(
            width,
            config.min_buffer_capacity,
        )),
        Framing::NulDelimited => Box::new(DelimitedReassembler::with_min_capacity(
            config.min_buffer_capacity,
        )),
    }
}

/// Parsing state of a [`Reassembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for a full length header.
    AwaitingHeader,
    /// Header parsed; collecting `declared` payload bytes.
    AccumulatingPayload { declared: usize },
}

/// Length-prefixed message reassembler.
///
/// Holds an intake buffer of bytes not yet classified and a pending buffer
/// for the payload of a message that spans chunks. Cycles between
/// [`State::AwaitingHeader`] and [`State::AccumulatingPayload`] once per
/// message.
#[derive(Debug)]
pub struct Reassembler {
    width: HeaderWidth,
    min_capacity: usize,
    intake: GrowableBuffer,
    pending: GrowableBuffer,
    state: State,
}

impl Reassembler {
    /// Create a reassembler with the default minimum buffer capacity.
    pub fn new(width: HeaderWidth) -> Self {
        Self::with_min_capacity(width, DEFAULT_MIN_BUFFER_CAPACITY)
    }

    /// Create a reassembler whose buffers are never shrunk below `min_capacity`.
    pub fn with_min_capacity(width: HeaderWidth, min_capacity: usize) -> Self {
        Self {
            width,
            min_capacity,
            intake: GrowableBuffer::new(),
            pending: GrowableBuffer::new(),
            state: State::AwaitingHeader,
        }
    }

    pub fn header_width(&self) -> HeaderWidth {
        self.width
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Bytes read but not yet classified into a message.
    pub fn buffered_len(&self) -> usize {
        self.intake.len()
    }

    pub fn intake_capacity(&self) -> usize {
        self.intake.capacity()
    }

    /// Payload bytes accumulated for the message in progress.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_capacity(&self) -> usize {
        self.pending.capacity()
    }

    /// Buffer `chunk` and deliver every message it completes.
    ///
    /// See [`Reassemble::ingest`].
    pub fn ingest<H: MessageHandler + ?Sized>(
        &mut self,
        chunk: &[u8],
        handler: &mut H,
    ) -> Result<usize> {
        match self.ingest_inner(chunk, handler) {
            Ok(delivered) => {
                debug!(
                    bytes = chunk.len(),
                    delivered,
                    buffered = self.intake.len(),
                    pending = self.pending.len(),
                    "ingested chunk"
                );
                Ok(delivered)
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    fn ingest_inner<H: MessageHandler + ?Sized>(
        &mut self,
        chunk: &[u8],
        handler: &mut H,
    ) -> Result<usize> {
        self.intake.append(chunk)?;

        let mut delivered = 0usize;
        loop {
            match self.state {
                State::AwaitingHeader => {
                    let header_len = self.width.size();
                    if self.intake.len() < header_len {
                        break;
                    }
                    let declared = self.width.decode(self.intake.as_slice());
                    self.intake.consume(header_len);
                    self.pending.clear();
                    self.state = State::AccumulatingPayload { declared };
                    trace!(declared, "parsed frame header");
                }
                State::AccumulatingPayload { declared } => {
                    let needed = declared - self.pending.len();
                    let available = self.intake.len();

                    if available >= needed {
                        if self.pending.is_empty() {
                            // Whole payload is already contiguous in the intake buffer.
                            handler.on_message(&self.intake.as_slice()[..needed]);
                        } else {
                            self.pending.append(&self.intake.as_slice()[..needed])?;
                            handler.on_message(self.pending.as_slice());
                        }
                        self.intake.consume(needed);
                        self.pending.clear();
                        self.state = State::AwaitingHeader;
                        delivered += 1;
                    } else {
                        self.pending.reserve(needed)?;
                        self.pending.append(self.intake.as_slice())?;
                        self.intake.consume(available);
                        break;
                    }
                }
            }
        }

        self.intake.shrink(self.min_capacity);
        let pending_floor = match self.state {
            State::AccumulatingPayload { declared } => self.min_capacity.max(declared),
            State::AwaitingHeader => self.min_capacity,
        };
        self.pending.shrink(pending_floor);

        Ok(delivered)
    }

    /// Free both buffers and return to [`State::AwaitingHeader`].
    pub fn reset(&mut self) {
        if self.state != State::AwaitingHeader || !self.intake.is_empty() {
            debug!(
                state = ?self.state,
                discarded = self.intake.len() + self.pending.len(),
                "discarding partial frame"
            );
        }
        self.intake.release();
        self.pending.release();
        self.state = State::AwaitingHeader;
    }
}

impl Reassemble for Reassembler {
    fn ingest(&mut self, chunk: &[u8], handler: &mut dyn MessageHandler) -> Result<usize> {
        Reassembler::ingest(self, chunk, handler)
    }

    fn reset(&mut self) {
        Reassembler::reset(self)
    }
}


#[cfg(test)]
mod proptests {
    use bytes::BytesMut;
    use proptest::prelude::*;

    use super::*;
    use crate::codec::encode_frame;

    fn reassemble(width: HeaderWidth, stream: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
        let mut reassembler = Reassembler::with_min_capacity(width, 64);
        let mut out = Vec::new();
        let mut start = 0;
        let mut bounds: Vec<usize> = cuts.iter().map(|c| c % (stream.len() + 1)).collect();
        bounds.push(stream.len());
        bounds.sort_unstable();
        for end in bounds {
            reassembler
                .ingest(&stream[start..end], &mut |p: &[u8]| out.push(p.to_vec()))
                .unwrap();
            start = end;
        }
        out
    }

    proptest! {
        #[test]
        fn output_independent_of_chunking(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..600), 0..12),
            cuts in prop::collection::vec(any::<usize>(), 0..20),
            one_byte in any::<bool>(),
        ) {
            let width = if one_byte { HeaderWidth::One } else { HeaderWidth::Two };
            let payloads: Vec<Vec<u8>> = payloads
                .into_iter()
                .map(|mut p| { p.truncate(width.max_payload()); p })
                .collect();

            let mut stream = BytesMut::new();
            for payload in &payloads {
                encode_frame(Framing::LengthPrefixed(width), payload, &mut stream).unwrap();
            }

            let got = reassemble(width, &stream, &cuts);
            prop_assert_eq!(got, payloads);
        }
    }
}
