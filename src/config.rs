//! Fixed parameters (C1) and the overridable configuration wrapping them.

/// UDP port the receiver endpoint binds by default.
pub const PORT_RECEIVER: u16 = 9100;
/// UDP port the sender endpoint binds by default.
pub const PORT_SENDER: u16 = 9101;

/// Upper bound on concurrent streams per connection.
pub const MAX_STREAMS: usize = 256;

/// Lower bound, advisory only, on a transmitted datagram (see SPEC_FULL §9
/// Q1 — the scheduler stops packing below this threshold but never pads).
pub const MIN_PACKET_SIZE: usize = 32;
/// Upper bound on a full datagram, header and all frames included.
pub const MAX_PACKET_SIZE: usize = 1_452;

/// Receive socket timeout in seconds; doubles as the end-of-connection
/// heuristic for the receive driver.
pub const TIMEOUT_SECS: u64 = 5;

/// Fixed width of the connection id tag, in bytes.
pub const CONNECTION_ID_LENGTH: usize = 8;

/// Stream frame header width: stream_id(8) + offset(8) + length(4) + flags(1).
pub const FRAME_HEADER_SIZE: usize = 21;
/// Packet header width: packet_number(8) + connection_id(8).
pub const HEADER_SIZE: usize = 16;

/// A frame payload below this size is only ever emitted as the final chunk
/// of a stream (see `StreamSender::generate_frame`).
pub const MIN_FRAME_PAYLOAD: usize = MIN_PACKET_SIZE.saturating_sub(HEADER_SIZE + FRAME_HEADER_SIZE);

/// Runtime-overridable knobs a driver may set before opening a connection.
///
/// `Default` seeds every field from the constants above, so a driver only
/// needs to override what it cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuicConfig {
    pub max_streams: usize,
    pub min_packet_size: usize,
    pub max_packet_size: usize,
    pub timeout_secs: u64,
}

impl Default for QuicConfig {
    fn default() -> Self {
        Self {
            max_streams: MAX_STREAMS,
            min_packet_size: MIN_PACKET_SIZE,
            max_packet_size: MAX_PACKET_SIZE,
            timeout_secs: TIMEOUT_SECS,
        }
    }
}

impl QuicConfig {
    /// The minimum payload a non-final chunk is worth sending, derived
    /// from this config's `min_packet_size` rather than the compiled-in
    /// constant, so a driver override actually takes effect.
    pub fn min_frame_payload(&self) -> usize {
        self.min_packet_size.saturating_sub(HEADER_SIZE + FRAME_HEADER_SIZE)
    }

    /// Advisory threshold below which the scheduler stops offering streams
    /// a chance to fill the current packet.
    pub fn min_useful_remaining(&self) -> usize {
        self.min_frame_payload() + FRAME_HEADER_SIZE
    }
}
