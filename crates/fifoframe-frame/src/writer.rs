use std::io::{ErrorKind, IoSlice, Write};
#[cfg(unix)]
use std::path::Path;

#[cfg(unix)]
use fifoframe_transport::FifoWriter;
use tracing::debug;

use crate::codec::{Framing, NUL_TERMINATOR};
use crate::error::{FrameError, Result};

/// Writes complete frames to any `Write` stream.
///
/// Each frame goes out as one vectored write. The writer keeps no state
/// between sends.
pub struct FrameWriter<T> {
    inner: T,
    framing: Framing,
}

impl<T: Write> FrameWriter<T> {
    /// Create a writer using the default 2-byte length framing.
    pub fn new(inner: T) -> Self {
        Self::with_framing(inner, Framing::default())
    }

    /// Create a writer with explicit framing.
    pub fn with_framing(inner: T, framing: Framing) -> Self {
        Self { inner, framing }
    }

    /// Frame and send `payload`.
    ///
    /// Payloads the framing cannot carry are rejected before anything is
    /// written. A write that accepts only part of the frame is reported as
    /// [`FrameError::PartialWrite`] and not retried.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        self.framing.check_payload(payload)?;

        let terminator = [NUL_TERMINATOR];
        let header;
        let parts: [IoSlice<'_>; 2] = match self.framing {
            Framing::LengthPrefixed(width) => {
                header = width.encode(payload.len())?;
                [IoSlice::new(header.as_ref()), IoSlice::new(payload)]
            }
            Framing::NulDelimited => [IoSlice::new(payload), IoSlice::new(&terminator)],
        };
        let expected = payload.len() + self.framing.overhead();

        let written = loop {
            match self.inner.write_vectored(&parts) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        if written != expected {
            return Err(FrameError::PartialWrite { written, expected });
        }

        self.flush()?;
        debug!(framing = self.framing.name(), bytes = written, "sent frame");
        Ok(written)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// The framing used for every send.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(unix)]
impl FrameWriter<FifoWriter> {
    /// Open the outbound FIFO at `path` (blocking until a reader is present).
    pub fn open(path: impl AsRef<Path>, framing: Framing) -> Result<Self> {
        let inner = FifoWriter::open(path)?;
        Ok(Self::with_framing(inner, framing))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::HeaderWidth;
    use crate::reassembler::Reassembler;

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn writes_header_then_payload() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        assert_eq!(writer.send(b"HELLO").unwrap(), 7);
        assert_eq!(written(writer), vec![0x00, 0x05, b'H', b'E', b'L', b'L', b'O']);
    }

    #[test]
    fn one_byte_header() {
        let mut writer = FrameWriter::with_framing(
            Cursor::new(Vec::new()),
            Framing::LengthPrefixed(HeaderWidth::One),
        );
        writer.send(b"abc").unwrap();
        assert_eq!(written(writer), vec![3, b'a', b'b', b'c']);
    }

    #[test]
    fn nul_delimited_appends_terminator() {
        let mut writer = FrameWriter::with_framing(Cursor::new(Vec::new()), Framing::NulDelimited);
        assert_eq!(writer.send(b"hi").unwrap(), 3);
        assert_eq!(written(writer), b"hi\0".to_vec());
    }

    #[test]
    fn oversized_payload_rejected_before_write() {
        let mut writer = FrameWriter::with_framing(
            Cursor::new(Vec::new()),
            Framing::LengthPrefixed(HeaderWidth::One),
        );
        let err = writer.send(&[0u8; 256]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 256, max: 255 }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn embedded_terminator_rejected_before_write() {
        let mut writer = FrameWriter::with_framing(Cursor::new(Vec::new()), Framing::NulDelimited);
        let err = writer.send(b"a\0b").unwrap_err();
        assert!(err.is_protocol_limit());
        assert!(written(writer).is_empty());
    }

    #[test]
    fn written_frames_reassemble() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        writer.send(b"one").unwrap();
        writer.send(b"").unwrap();
        writer.send(b"three").unwrap();
        let wire = written(writer);

        let mut reassembler = Reassembler::new(HeaderWidth::Two);
        let mut out = Vec::new();
        reassembler
            .ingest(&wire, &mut |p: &[u8]| out.push(p.to_vec()))
            .unwrap();
        assert_eq!(out, vec![b"one".to_vec(), Vec::new(), b"three".to_vec()]);
    }

    #[test]
    fn short_write_is_partial_write_fault() {
        let mut writer = FrameWriter::new(ShortWriter { limit: 3 });
        let err = writer.send(b"payload").unwrap_err();
        assert!(matches!(
            err,
            FrameError::PartialWrite {
                written: 3,
                expected: 9
            }
        ));
    }

    #[test]
    fn interrupted_write_is_retried() {
        let mut writer = FrameWriter::new(InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        });
        writer.send(b"retry").unwrap();
        assert_eq!(writer.get_ref().data, vec![0, 5, b'r', b'e', b't', b'r', b'y']);
    }

    #[test]
    fn io_error_propagates() {
        let mut writer = FrameWriter::new(BrokenPipe);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(writer.framing(), Framing::default());
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    /// Accepts at most `limit` bytes per vectored write.
    struct ShortWriter {
        limit: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len().min(self.limit))
        }

        fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
            let total: usize = bufs.iter().map(|b| b.len()).sum();
            Ok(total.min(self.limit))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let mut n = 0;
            for buf in bufs {
                self.data.extend_from_slice(buf);
                n += buf.len();
            }
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
            let mut n = 0;
            for buf in bufs {
                self.data.extend_from_slice(buf);
                n += buf.len();
            }
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}
