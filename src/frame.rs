//! STREAM frame encoding (C2): the only frame kind this core knows.
//!
//! Fixed network-byte-order layout, 21 bytes of header before the payload:
//! `stream_id:8 | offset:8 | length:4 | flags:1 | payload:length`.

use crate::config::FRAME_HEADER_SIZE;
use crate::error::{QuicError, QuicResult};

const FIN_BIT: u8 = 0b0000_0001;

/// A single STREAM frame: an offsetted byte range within one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub stream_id: u64,
    pub offset: u64,
    pub fin: bool,
    pub payload: Vec<u8>,
}

impl StreamFrame {
    pub fn new(stream_id: u64, offset: u64, payload: Vec<u8>, fin: bool) -> Self {
        Self {
            stream_id,
            offset,
            fin,
            payload,
        }
    }

    /// Byte range this frame covers: `[offset, offset + length)`.
    pub fn end(&self) -> u64 {
        self.offset + self.payload.len() as u64
    }

    /// Total encoded size, header plus payload.
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.stream_id.to_be_bytes());
        out.extend_from_slice(&self.offset.to_be_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        out.push(if self.fin { FIN_BIT } else { 0 });
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode one frame starting at `cursor`, returning the frame and the
    /// cursor advanced past it. Fails without consuming `bytes` if the
    /// fixed header or the declared payload don't fit in what remains.
    pub fn decode(bytes: &[u8], cursor: usize) -> QuicResult<(Self, usize)> {
        let available = bytes.len().saturating_sub(cursor);
        if available < FRAME_HEADER_SIZE {
            return Err(QuicError::TruncatedFrame {
                needed: FRAME_HEADER_SIZE,
                available,
            });
        }

        let mut pos = cursor;
        let stream_id = u64::from_be_bytes(bytes[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let offset = u64::from_be_bytes(bytes[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let length = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        let flags = bytes[pos];
        pos += 1;

        if flags & !FIN_BIT != 0 {
            return Err(QuicError::ReservedBitsSet(flags));
        }
        let fin = flags & FIN_BIT != 0;

        let remaining = bytes.len().saturating_sub(pos);
        if length > remaining {
            return Err(QuicError::TruncatedFrame {
                needed: length,
                available: remaining,
            });
        }

        let payload = bytes[pos..pos + length].to_vec();
        pos += length;

        Ok((
            StreamFrame {
                stream_id,
                offset,
                fin,
                payload,
            },
            pos,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_a_simple_frame() {
        let frame = StreamFrame::new(7, 42, b"hello".to_vec(), true);
        let encoded = frame.encode();
        let (decoded, cursor) = StreamFrame::decode(&encoded, 0).unwrap();
        assert_eq!(frame, decoded);
        assert_eq!(cursor, encoded.len());
    }

    #[test]
    fn rejects_truncated_header() {
        let short = vec![0u8; FRAME_HEADER_SIZE - 1];
        let err = StreamFrame::decode(&short, 0).unwrap_err();
        assert!(matches!(err, QuicError::TruncatedFrame { .. }));
    }

    #[test]
    fn rejects_length_beyond_buffer() {
        let frame = StreamFrame::new(0, 0, b"abcdef".to_vec(), false);
        let mut encoded = frame.encode();
        encoded.truncate(encoded.len() - 1);
        let err = StreamFrame::decode(&encoded, 0).unwrap_err();
        assert!(matches!(err, QuicError::TruncatedFrame { .. }));
    }

    #[test]
    fn rejects_reserved_bits() {
        let frame = StreamFrame::new(0, 0, b"x".to_vec(), false);
        let mut encoded = frame.encode();
        encoded[20] = 0b0000_0010;
        let err = StreamFrame::decode(&encoded, 0).unwrap_err();
        assert!(matches!(err, QuicError::ReservedBitsSet(_)));
    }

    proptest! {
        #[test]
        fn decode_encode_is_identity(
            stream_id in any::<u64>(),
            offset in any::<u64>(),
            fin in any::<bool>(),
            payload in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let frame = StreamFrame::new(stream_id, offset, payload, fin);
            let encoded = frame.encode();
            let (decoded, cursor) = StreamFrame::decode(&encoded, 0).unwrap();
            prop_assert_eq!(&frame, &decoded);
            prop_assert_eq!(cursor, encoded.len());
        }

        #[test]
        fn decode_at_nonzero_cursor_skips_a_prefix(
            prefix in prop::collection::vec(any::<u8>(), 0..64),
            payload in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let frame = StreamFrame::new(1, 2, payload, false);
            let mut buf = prefix.clone();
            buf.extend(frame.encode());
            let (decoded, cursor) = StreamFrame::decode(&buf, prefix.len()).unwrap();
            prop_assert_eq!(&frame, &decoded);
            prop_assert_eq!(cursor, buf.len());
        }
    }
}
