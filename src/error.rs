use thiserror::Error;

pub type QuicResult<T> = Result<T, QuicError>;

/// Every failure mode named in the framing, stream, and connection layers.
#[derive(Debug, Error)]
pub enum QuicError {
    #[error("truncated packet header: need {needed} bytes, have {available}")]
    TruncatedHeader { needed: usize, available: usize },

    #[error("truncated stream frame: need {needed} bytes, have {available}")]
    TruncatedFrame { needed: usize, available: usize },

    #[error("reserved flag bits set: {0:#010b}")]
    ReservedBitsSet(u8),

    #[error("packet of {size} bytes exceeds MAX_PACKET_SIZE of {max}")]
    PacketTooLarge { size: usize, max: usize },

    #[error("requested frame payload of at most {max_payload} bytes leaves no room for a byte of data")]
    FrameTooSmall { max_payload: usize },

    #[error("write to stream {stream_id} after finish() was already called")]
    WriteAfterFin { stream_id: u64 },

    #[error("frame on stream {stream_id} ends at {end} but fin_offset is already {fin_offset}")]
    FinContradicted {
        stream_id: u64,
        end: u64,
        fin_offset: u64,
    },

    #[error("stream {stream_id} received a second FIN at {new_offset}, first was at {first_offset}")]
    FinConflict {
        stream_id: u64,
        first_offset: u64,
        new_offset: u64,
    },

    #[error("stream {0} is not known to this connection")]
    UnknownStream(u64),

    #[error("stream {stream_id} does not have a {expected} half ({direction:?} stream owned {role})")]
    WrongDirection {
        stream_id: u64,
        expected: &'static str,
        direction: crate::stream::Direction,
        role: &'static str,
    },

    #[error("stream table already holds {max_streams} streams")]
    TooManyStreams { max_streams: usize },

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
}
