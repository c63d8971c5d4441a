//! StreamReceiver (C6): reassembles out-of-order STREAM frames into an
//! in-order prefix, first-writer-wins on overlap, FIN-offset tracked once
//! seen.

use std::collections::{BTreeMap, VecDeque};

use crate::error::{QuicError, QuicResult};
use crate::frame::StreamFrame;

#[derive(Debug)]
pub struct StreamReceiver {
    stream_id: u64,
    /// Out-of-order segments buffered ahead of `delivered_upto`, keyed by
    /// their starting offset. Segments never overlap each other or the
    /// delivered prefix once inserted.
    segments: BTreeMap<u64, Vec<u8>>,
    /// In-order bytes assembled but not yet drained by `read_available`.
    ready: VecDeque<u8>,
    /// Length of the contiguous prefix assembled so far (read + ready).
    delivered_upto: u64,
    fin_offset: Option<u64>,
}

impl StreamReceiver {
    pub fn new(stream_id: u64) -> Self {
        Self {
            stream_id,
            segments: BTreeMap::new(),
            ready: VecDeque::new(),
            delivered_upto: 0,
            fin_offset: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fin_offset == Some(self.delivered_upto)
    }

    pub fn read_available(&mut self) -> Vec<u8> {
        self.ready.drain(..).collect()
    }

    /// Insert the frame's payload at its offset, update `fin_offset` if
    /// this is a FIN frame, and advance the in-order prefix as far as
    /// buffered segments allow.
    pub fn receive_frame(&mut self, frame: StreamFrame) -> QuicResult<()> {
        let end = frame.end();

        if let Some(fin_offset) = self.fin_offset {
            if end > fin_offset {
                return Err(QuicError::FinContradicted {
                    stream_id: self.stream_id,
                    end,
                    fin_offset,
                });
            }
        }

        if frame.fin {
            match self.fin_offset {
                Some(existing) if existing != end => {
                    return Err(QuicError::FinConflict {
                        stream_id: self.stream_id,
                        first_offset: existing,
                        new_offset: end,
                    });
                }
                _ => self.fin_offset = Some(end),
            }
        }

        if end <= self.delivered_upto {
            // Entirely duplicate of already-delivered bytes, or a
            // redundant FIN terminator restating an offset we've already
            // passed. Idempotent: nothing left to do.
            return Ok(());
        }

        let mut offset = frame.offset;
        let mut payload = frame.payload;
        if offset < self.delivered_upto {
            let skip = (self.delivered_upto - offset) as usize;
            payload.drain(0..skip);
            offset = self.delivered_upto;
        }

        self.insert_segment(offset, payload);
        self.advance();
        Ok(())
    }

    /// Insert `payload` at `offset`, trimming away any bytes that overlap
    /// an already-buffered segment (first-writer-wins).
    fn insert_segment(&mut self, mut offset: u64, mut payload: Vec<u8>) {
        if payload.is_empty() {
            return;
        }
        let mut end = offset + payload.len() as u64;

        if let Some((&prev_offset, prev_buf)) = self.segments.range(..=offset).next_back() {
            let prev_end = prev_offset + prev_buf.len() as u64;
            if prev_end > offset {
                if prev_end >= end {
                    return; // fully covered by an existing segment
                }
                let skip = (prev_end - offset) as usize;
                payload.drain(0..skip);
                offset = prev_end;
            }
        }

        while let Some((&next_offset, next_buf)) = self.segments.range(offset..).next() {
            if next_offset >= end {
                break;
            }
            let next_end = next_offset + next_buf.len() as u64;
            if next_offset <= offset {
                // Defensive: shouldn't happen given the predecessor check
                // above, but keep the invariant that we only ever store
                // non-overlapping segments.
                if next_end >= end {
                    return;
                }
                let skip = (next_end - offset) as usize;
                payload.drain(0..skip);
                offset = next_end;
                continue;
            }
            let keep = (next_offset - offset) as usize;
            payload.truncate(keep);
            end = next_offset;
            break;
        }

        if !payload.is_empty() {
            self.segments.insert(offset, payload);
        }
    }

    fn advance(&mut self) {
        while let Some(buf) = self.segments.remove(&self.delivered_upto) {
            self.delivered_upto += buf.len() as u64;
            self.ready.extend(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn in_order_delivery() {
        let mut receiver = StreamReceiver::new(0);
        receiver
            .receive_frame(StreamFrame::new(0, 0, b"HELLO WORLD".to_vec(), true))
            .unwrap();
        assert_eq!(receiver.read_available(), b"HELLO WORLD");
        assert!(receiver.is_complete());
    }

    #[test]
    fn reordered_chunks_reassemble() {
        let mut receiver = StreamReceiver::new(0);
        let chunks = vec![
            StreamFrame::new(0, 0, vec![0x41; 1000], false),
            StreamFrame::new(0, 1000, vec![0x41; 1000], false),
            StreamFrame::new(0, 2000, vec![0x41; 1000], false),
            StreamFrame::new(0, 3000, vec![0x41; 1000], false),
            StreamFrame::new(0, 4000, vec![0x41; 1000], true),
        ];
        for frame in chunks.into_iter().rev() {
            receiver.receive_frame(frame).unwrap();
        }
        let bytes = receiver.read_available();
        assert_eq!(bytes.len(), 5000);
        assert!(bytes.iter().all(|&b| b == 0x41));
        assert!(receiver.is_complete());
    }

    #[test]
    fn duplicate_frame_is_idempotent() {
        let mut receiver = StreamReceiver::new(0);
        let frame = StreamFrame::new(0, 0, b"abc".to_vec(), false);
        receiver.receive_frame(frame.clone()).unwrap();
        let before = receiver.delivered_upto;
        receiver.receive_frame(frame).unwrap();
        assert_eq!(receiver.delivered_upto, before);
    }

    #[test]
    fn explicit_empty_fin_terminator_completes() {
        let mut receiver = StreamReceiver::new(0);
        receiver
            .receive_frame(StreamFrame::new(0, 0, vec![0u8; 100], false))
            .unwrap();
        assert!(!receiver.is_complete());
        receiver
            .receive_frame(StreamFrame::new(0, 100, Vec::new(), true))
            .unwrap();
        assert!(receiver.is_complete());
    }

    #[test]
    fn overlap_past_fin_is_contradicted() {
        let mut receiver = StreamReceiver::new(0);
        receiver
            .receive_frame(StreamFrame::new(0, 0, vec![0u8; 10], true))
            .unwrap();
        let err = receiver
            .receive_frame(StreamFrame::new(0, 5, vec![0u8; 10], false))
            .unwrap_err();
        assert!(matches!(err, QuicError::FinContradicted { .. }));
    }

    #[test]
    fn conflicting_fin_is_rejected() {
        let mut receiver = StreamReceiver::new(0);
        receiver
            .receive_frame(StreamFrame::new(0, 0, vec![0u8; 10], true))
            .unwrap();
        let err = receiver
            .receive_frame(StreamFrame::new(0, 0, vec![0u8; 5], true))
            .unwrap_err();
        assert!(matches!(err, QuicError::FinConflict { .. }));
    }

    #[test]
    fn overlapping_segments_keep_first_writer() {
        let mut receiver = StreamReceiver::new(0);
        receiver
            .receive_frame(StreamFrame::new(0, 0, b"AAAA".to_vec(), false))
            .unwrap();
        // Overlaps [2,6) with different bytes; [2,4) must stay "AA".
        receiver
            .receive_frame(StreamFrame::new(0, 2, b"BBBB".to_vec(), false))
            .unwrap();
        receiver
            .receive_frame(StreamFrame::new(0, 4, b"CC".to_vec(), true))
            .unwrap();
        assert_eq!(receiver.read_available(), b"AAAABB");
    }

    proptest! {
        #[test]
        fn any_permutation_of_a_chunked_stream_reassembles(
            seed in prop::collection::vec(any::<u8>(), 1..2000),
            chunk_size in 1usize..500,
        ) {
            let mut frames = Vec::new();
            let mut offset = 0u64;
            for chunk in seed.chunks(chunk_size) {
                offset += chunk.len() as u64;
                frames.push(StreamFrame::new(0, offset - chunk.len() as u64, chunk.to_vec(), false));
            }
            if let Some(last) = frames.last_mut() {
                last.fin = true;
            }

            // deterministic shuffle: reverse halves and interleave
            let mid = frames.len() / 2;
            let (first, second) = frames.split_at(mid);
            let mut shuffled: Vec<_> = second.iter().chain(first.iter()).cloned().collect();
            shuffled.reverse();

            let mut receiver = StreamReceiver::new(0);
            for frame in shuffled {
                receiver.receive_frame(frame).unwrap();
            }

            prop_assert_eq!(receiver.read_available(), seed);
            prop_assert!(receiver.is_complete());
        }
    }
}
