//! StreamSender (C5): chunks an application byte buffer into STREAM frames
//! in strictly increasing, contiguous offset order, marking FIN on exactly
//! one frame.

use std::collections::VecDeque;

use crate::error::{QuicError, QuicResult};
use crate::frame::StreamFrame;

#[derive(Debug)]
pub struct StreamSender {
    stream_id: u64,
    pending: VecDeque<u8>,
    next_offset: u64,
    /// `finish()` has been called: no more `add_data` accepted.
    finished: bool,
    /// The FIN-bearing frame has actually been emitted.
    fin_emitted: bool,
}

impl StreamSender {
    pub fn new(stream_id: u64) -> Self {
        Self {
            stream_id,
            pending: VecDeque::new(),
            next_offset: 0,
            finished: false,
            fin_emitted: false,
        }
    }

    pub fn add_data(&mut self, bytes: &[u8]) -> QuicResult<()> {
        if self.finished {
            return Err(QuicError::WriteAfterFin {
                stream_id: self.stream_id,
            });
        }
        self.pending.extend(bytes.iter().copied());
        Ok(())
    }

    /// Mark the current end of the buffer as final; FIN rides on whichever
    /// frame ends up consuming the remainder.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn has_data_to_send(&self) -> bool {
        !self.pending.is_empty() || (self.finished && !self.fin_emitted)
    }

    pub fn is_terminal(&self) -> bool {
        self.fin_emitted && self.pending.is_empty()
    }

    /// Produce the next frame, with payload `min(buffered_remaining,
    /// max_payload)`. Returns `None` when there's nothing to send right
    /// now. FIN is set iff `finish()` was called and this chunk drains the
    /// buffer. A zero-byte final frame is valid (the explicit FIN
    /// terminator of S5).
    pub fn generate_frame(&mut self, max_payload: usize) -> QuicResult<Option<StreamFrame>> {
        if !self.has_data_to_send() {
            return Ok(None);
        }

        let available = self.pending.len();
        let chunk_len = available.min(max_payload);
        // FIN only rides on this chunk if the buffer is provably drained,
        // i.e. this chunk is smaller than what we were allowed to send (we
        // stopped because we ran out of data, not because of the cap) or
        // there was nothing to send at all. A chunk that exactly saturates
        // `max_payload` defers FIN to a following empty frame, since an
        // exact fit can't be told apart from "more data is still buffered".
        let fin = self.finished && (chunk_len == 0 || chunk_len < max_payload);

        if chunk_len == 0 && !fin {
            return Err(QuicError::FrameTooSmall { max_payload });
        }

        let payload: Vec<u8> = self.pending.drain(..chunk_len).collect();
        let offset = self.next_offset;
        self.next_offset += chunk_len as u64;

        if fin {
            self.fin_emitted = true;
        }

        Ok(Some(StreamFrame::new(self.stream_id, offset, payload, fin)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_covers_a_short_write() {
        let mut sender = StreamSender::new(0);
        sender.add_data(b"HELLO WORLD").unwrap();
        sender.finish();

        let frame = sender.generate_frame(64).unwrap().unwrap();
        assert_eq!(frame.offset, 0);
        assert_eq!(frame.payload, b"HELLO WORLD");
        assert!(frame.fin);
        assert!(sender.generate_frame(64).unwrap().is_none());
    }

    #[test]
    fn chunks_when_max_payload_is_small() {
        let mut sender = StreamSender::new(0);
        sender.add_data(&vec![0x41; 5000]).unwrap();
        sender.finish();

        let mut total = Vec::new();
        let mut fin_count = 0;
        while let Some(frame) = sender.generate_frame(1024).unwrap() {
            assert_eq!(frame.offset, total.len() as u64);
            if frame.fin {
                fin_count += 1;
            }
            total.extend(frame.payload);
        }

        assert_eq!(total.len(), 5000);
        assert!(total.iter().all(|&b| b == 0x41));
        assert_eq!(fin_count, 1);
    }

    #[test]
    fn explicit_empty_fin_terminator() {
        let mut sender = StreamSender::new(0);
        sender.add_data(&vec![0u8; 100]).unwrap();
        sender.finish();

        let first = sender.generate_frame(100).unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.payload.len(), 100);
        assert!(!first.fin);

        let second = sender.generate_frame(100).unwrap().unwrap();
        assert_eq!(second.offset, 100);
        assert_eq!(second.payload.len(), 0);
        assert!(second.fin);

        assert!(sender.is_terminal());
    }

    #[test]
    fn write_after_fin_is_rejected() {
        let mut sender = StreamSender::new(0);
        sender.finish();
        let err = sender.add_data(b"too late").unwrap_err();
        assert!(matches!(err, QuicError::WriteAfterFin { .. }));
    }

    #[test]
    fn returns_none_with_nothing_buffered_and_not_finished() {
        let mut sender = StreamSender::new(0);
        assert!(sender.generate_frame(64).unwrap().is_none());
    }
}
