use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Default upper bound for a single poll read: 2 KiB.
pub const DEFAULT_READ_CHUNK_SIZE: usize = fifoframe_transport::DEFAULT_CHUNK_SIZE;

/// Buffers at or below this capacity are never shrunk: 8 KiB.
pub const DEFAULT_MIN_BUFFER_CAPACITY: usize = 8 * 1024;

/// Message terminator for [`Framing::NulDelimited`].
pub const NUL_TERMINATOR: u8 = 0x00;

/// Width of the length header that prefixes every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderWidth {
    /// One raw byte, payloads up to 255 bytes.
    One,
    /// Two bytes in network (big-endian) order, payloads up to 65535 bytes.
    #[default]
    Two,
}

impl HeaderWidth {
    /// Number of header bytes on the wire.
    pub const fn size(self) -> usize {
        match self {
            HeaderWidth::One => 1,
            HeaderWidth::Two => 2,
        }
    }

    /// Largest payload length the header can represent.
    pub const fn max_payload(self) -> usize {
        match self {
            HeaderWidth::One => u8::MAX as usize,
            HeaderWidth::Two => u16::MAX as usize,
        }
    }

    /// Read the declared payload length from the first `size()` bytes of `header`.
    ///
    /// Panics if `header` is shorter than `size()`.
    pub fn decode(self, header: &[u8]) -> usize {
        match self {
            HeaderWidth::One => usize::from(header[0]),
            HeaderWidth::Two => usize::from(u16::from_be_bytes([header[0], header[1]])),
        }
    }

    /// Encode `len` as a header, failing if it is out of range.
    pub fn encode(self, len: usize) -> Result<EncodedHeader> {
        if len > self.max_payload() {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.max_payload(),
            });
        }
        let bytes = match self {
            HeaderWidth::One => [len as u8, 0],
            HeaderWidth::Two => (len as u16).to_be_bytes(),
        };
        Ok(EncodedHeader {
            bytes,
            len: self.size(),
        })
    }
}

/// A length header ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedHeader {
    bytes: [u8; 2],
    len: usize,
}

impl AsRef<[u8]> for EncodedHeader {
    fn as_ref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// How messages are delimited on the wire.
///
/// Peers must agree on one framing; nothing on the wire identifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Fixed-width length header followed by the payload.
    LengthPrefixed(HeaderWidth),
    /// Payload followed by a single [`NUL_TERMINATOR`] byte.
    NulDelimited,
}

impl Default for Framing {
    fn default() -> Self {
        Framing::LengthPrefixed(HeaderWidth::default())
    }
}

impl Framing {
    /// Reject payloads this framing cannot carry.
    ///
    /// Called before any byte of a frame is written.
    pub fn check_payload(&self, payload: &[u8]) -> Result<()> {
        match self {
            Framing::LengthPrefixed(width) => {
                if payload.len() > width.max_payload() {
                    return Err(FrameError::PayloadTooLarge {
                        size: payload.len(),
                        max: width.max_payload(),
                    });
                }
            }
            Framing::NulDelimited => {
                if let Some(offset) = payload.iter().position(|&b| b == NUL_TERMINATOR) {
                    return Err(FrameError::EmbeddedTerminator { offset });
                }
            }
        }
        Ok(())
    }

    /// Number of framing bytes added around a payload.
    pub fn overhead(&self) -> usize {
        match self {
            Framing::LengthPrefixed(width) => width.size(),
            Framing::NulDelimited => 1,
        }
    }

    /// Short name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Framing::LengthPrefixed(HeaderWidth::One) => "u8",
            Framing::LengthPrefixed(HeaderWidth::Two) => "u16",
            Framing::NulDelimited => "nul",
        }
    }
}

/// Encode one frame into `dst`.
///
/// Wire format (length-prefixed, 2-byte header):
/// ```text
/// ┌──────────────────┬──────────────────┐
/// │ Length (2B BE)   │ Payload          │
/// │                  │ (Length bytes)   │
/// └──────────────────┴──────────────────┘
/// ```
/// The 1-byte variant uses a single raw length byte. The NUL-delimited variant
/// has no header and appends one `0x00` byte.
pub fn encode_frame(framing: Framing, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    framing.check_payload(payload)?;
    dst.reserve(framing.overhead() + payload.len());
    match framing {
        Framing::LengthPrefixed(width) => {
            dst.put_slice(width.encode(payload.len())?.as_ref());
            dst.put_slice(payload);
        }
        Framing::NulDelimited => {
            dst.put_slice(payload);
            dst.put_u8(NUL_TERMINATOR);
        }
    }
    Ok(())
}

/// Configuration for reassembly and polling.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Wire framing. Default: 2-byte big-endian length header.
    pub framing: Framing,
    /// Maximum bytes taken from the channel per poll. Default: 2 KiB.
    pub read_chunk_size: usize,
    /// Capacity below which buffers are never shrunk. Default: 8 KiB.
    pub min_buffer_capacity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            min_buffer_capacity: DEFAULT_MIN_BUFFER_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_byte_header_is_big_endian() {
        let header = HeaderWidth::Two.encode(0x0105).unwrap();
        assert_eq!(header.as_ref(), &[0x01, 0x05]);
        assert_eq!(HeaderWidth::Two.decode(&[0x01, 0x05]), 0x0105);
    }

    #[test]
    fn one_byte_header_is_raw() {
        let header = HeaderWidth::One.encode(200).unwrap();
        assert_eq!(header.as_ref(), &[200]);
        assert_eq!(HeaderWidth::One.decode(&[200, 0xFF]), 200);
    }

    #[test]
    fn header_limits() {
        assert_eq!(HeaderWidth::One.max_payload(), 255);
        assert_eq!(HeaderWidth::Two.max_payload(), 65535);
        assert!(HeaderWidth::One.encode(255).is_ok());
        assert!(matches!(
            HeaderWidth::One.encode(256),
            Err(FrameError::PayloadTooLarge { size: 256, max: 255 })
        ));
        assert!(matches!(
            HeaderWidth::Two.encode(65536),
            Err(FrameError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn encode_hello_example() {
        let mut buf = BytesMut::new();
        encode_frame(Framing::default(), b"HELLO", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x00, 0x05, b'H', b'E', b'L', b'L', b'O']);
    }

    #[test]
    fn encode_rejects_oversized_without_writing() {
        let mut buf = BytesMut::new();
        let payload = vec![7u8; 256];
        let err = encode_frame(Framing::LengthPrefixed(HeaderWidth::One), &payload, &mut buf)
            .unwrap_err();
        assert!(err.is_protocol_limit());
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_empty_payload() {
        let mut buf = BytesMut::new();
        encode_frame(Framing::LengthPrefixed(HeaderWidth::One), b"", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x00]);
    }

    #[test]
    fn nul_delimited_appends_terminator() {
        let mut buf = BytesMut::new();
        encode_frame(Framing::NulDelimited, b"hi", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"hi\0");
    }

    #[test]
    fn nul_delimited_rejects_embedded_terminator() {
        let err = Framing::NulDelimited.check_payload(b"ab\0cd").unwrap_err();
        assert!(matches!(err, FrameError::EmbeddedTerminator { offset: 2 }));
    }

    #[test]
    fn framing_names_and_overhead() {
        assert_eq!(Framing::default().name(), "u16");
        assert_eq!(Framing::default().overhead(), 2);
        assert_eq!(Framing::LengthPrefixed(HeaderWidth::One).name(), "u8");
        assert_eq!(Framing::NulDelimited.overhead(), 1);
    }

    #[test]
    fn default_config() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.read_chunk_size, 2048);
        assert_eq!(cfg.min_buffer_capacity, 8192);
        assert_eq!(cfg.framing, Framing::LengthPrefixed(HeaderWidth::Two));
    }
}
