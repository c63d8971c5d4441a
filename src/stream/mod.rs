//! Stream (C7): pairs a sender and/or receiver half under one stream id,
//! routing calls to whichever half exists.

pub mod receiver;
pub mod sender;

pub use receiver::StreamReceiver;
pub use sender::StreamSender;

use crate::error::{QuicError, QuicResult};
use crate::frame::StreamFrame;

/// Directionality derived from bit 1 of the stream id. Observable metadata
/// only in this core, but it gates which half a `Stream` is allowed to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bidirectional,
    Unidirectional,
}

impl Direction {
    pub fn of(stream_id: u64) -> Self {
        if (stream_id >> 1) & 1 == 1 {
            Direction::Unidirectional
        } else {
            Direction::Bidirectional
        }
    }
}

/// Which half of a unidirectional stream the local endpoint owns. Ignored
/// for bidirectional streams, which always have both halves locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

#[derive(Debug)]
pub struct Stream {
    pub id: u64,
    pub direction: Direction,
    sender: Option<StreamSender>,
    receiver: Option<StreamReceiver>,
    bytes_sent: u64,
    bytes_received: u64,
    failed: bool,
}

impl Stream {
    /// Open a stream this endpoint initiates (or knows the role for
    /// locally): bidirectional streams get both halves, unidirectional
    /// streams get only the half matching `role`.
    pub fn open(stream_id: u64, role: Role) -> Self {
        let direction = Direction::of(stream_id);
        let (sender, receiver) = match direction {
            Direction::Bidirectional => (
                Some(StreamSender::new(stream_id)),
                Some(StreamReceiver::new(stream_id)),
            ),
            Direction::Unidirectional => match role {
                Role::Sender => (Some(StreamSender::new(stream_id)), None),
                Role::Receiver => (None, Some(StreamReceiver::new(stream_id))),
            },
        };
        Self {
            id: stream_id,
            direction,
            sender,
            receiver,
            bytes_sent: 0,
            bytes_received: 0,
            failed: false,
        }
    }

    /// Auto-created on first sight of an unknown stream id at the receive
    /// dispatcher (§4.7): a receive-only half regardless of the id's
    /// direction bits, since we don't yet know whether we'll ever send on
    /// it.
    pub fn new_receive_only(stream_id: u64) -> Self {
        Self {
            id: stream_id,
            direction: Direction::of(stream_id),
            sender: None,
            receiver: Some(StreamReceiver::new(stream_id)),
            bytes_sent: 0,
            bytes_received: 0,
            failed: false,
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn has_data_to_send(&self) -> bool {
        !self.failed
            && self
                .sender
                .as_ref()
                .map_or(false, StreamSender::has_data_to_send)
    }

    fn wrong_direction(&self, expected: &'static str) -> QuicError {
        QuicError::WrongDirection {
            stream_id: self.id,
            expected,
            direction: self.direction,
            role: if self.sender.is_some() {
                "sender-only"
            } else if self.receiver.is_some() {
                "receiver-only"
            } else {
                "neither"
            },
        }
    }

    /// Ask this stream's sender for a frame, if it has one.
    pub fn next_frame(&mut self, max_payload: usize) -> QuicResult<Option<StreamFrame>> {
        let Some(sender) = self.sender.as_mut() else {
            return Ok(None);
        };
        let frame = sender.generate_frame(max_payload)?;
        if let Some(frame) = &frame {
            self.bytes_sent += frame.payload.len() as u64;
        }
        Ok(frame)
    }

    /// Deliver a received frame to this stream's receiver half. Fails with
    /// `WrongDirection` if this stream has no receiver (a send-only
    /// unidirectional stream this endpoint opened itself).
    pub fn deliver(&mut self, frame: StreamFrame) -> QuicResult<()> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(self.wrong_direction("receiver"));
        };
        let len = frame.payload.len() as u64;
        receiver.receive_frame(frame)?;
        self.bytes_received += len;
        Ok(())
    }

    pub fn write(&mut self, bytes: &[u8]) -> QuicResult<()> {
        let Some(sender) = self.sender.as_mut() else {
            return Err(self.wrong_direction("sender"));
        };
        sender.add_data(bytes)
    }

    pub fn finish(&mut self) -> QuicResult<()> {
        let Some(sender) = self.sender.as_mut() else {
            return Err(self.wrong_direction("sender"));
        };
        sender.finish();
        Ok(())
    }

    pub fn read_available(&mut self) -> Vec<u8> {
        self.receiver
            .as_mut()
            .map(StreamReceiver::read_available)
            .unwrap_or_default()
    }

    pub fn is_terminal(&self) -> bool {
        let sender_done = self.sender.as_ref().map_or(true, StreamSender::is_terminal);
        let receiver_done = self
            .receiver
            .as_ref()
            .map_or(true, StreamReceiver::is_complete);
        self.failed || (sender_done && receiver_done)
    }
}
