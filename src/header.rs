//! Fixed-width packet header (C3): `packet_number:8 | connection_id:8`.

use crate::config::{CONNECTION_ID_LENGTH, HEADER_SIZE};
use crate::error::{QuicError, QuicResult};

/// An opaque fixed-width connection tag. Fixed at 8 bytes in this core
/// (`CONNECTION_ID_LENGTH`); there is no variable-length tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId([u8; CONNECTION_ID_LENGTH]);

impl ConnectionId {
    pub fn new(bytes: [u8; CONNECTION_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONNECTION_ID_LENGTH] {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_number: u64,
    pub connection_id: ConnectionId,
}

impl PacketHeader {
    pub fn new(packet_number: u64, connection_id: ConnectionId) -> Self {
        Self {
            packet_number,
            connection_id,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&self.packet_number.to_be_bytes());
        out.extend_from_slice(self.connection_id.as_bytes());
        out
    }

    /// Decode the header starting at `cursor`, returning the header and the
    /// advanced cursor.
    pub fn decode(bytes: &[u8], cursor: usize) -> QuicResult<(Self, usize)> {
        let available = bytes.len().saturating_sub(cursor);
        if available < HEADER_SIZE {
            return Err(QuicError::TruncatedHeader {
                needed: HEADER_SIZE,
                available,
            });
        }

        let mut pos = cursor;
        let packet_number = u64::from_be_bytes(bytes[pos..pos + 8].try_into().unwrap());
        pos += 8;
        let mut cid = [0u8; CONNECTION_ID_LENGTH];
        cid.copy_from_slice(&bytes[pos..pos + CONNECTION_ID_LENGTH]);
        pos += CONNECTION_ID_LENGTH;

        Ok((
            PacketHeader {
                packet_number,
                connection_id: ConnectionId::new(cid),
            },
            pos,
        ))
    }
}
