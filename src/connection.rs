//! QuicConnection (C8): owns the UDP endpoint, the stream table, the send
//! scheduler, and the receive dispatcher.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use crate::config::{QuicConfig, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::error::{QuicError, QuicResult};
use crate::header::{ConnectionId, PacketHeader};
use crate::packet::Packet;
use crate::stats::{ConnectionStats, StatsSnapshot};
use crate::stream::{Role, Stream};

pub struct QuicConnection {
    socket: UdpSocket,
    streams: Mutex<BTreeMap<u64, Stream>>,
    connection_id: ConnectionId,
    config: QuicConfig,
    send_pn: AtomicU64,
    recv_pn: AtomicU64,
    /// Lowest stream id the next scheduler pass should start offering,
    /// for round-robin fairness across invocations (§4.7 send scheduler).
    round_robin_cursor: Mutex<u64>,
    stats: Mutex<ConnectionStats>,
}

impl QuicConnection {
    pub async fn new(
        connection_id: ConnectionId,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        config: QuicConfig,
    ) -> QuicResult<Self> {
        let socket = UdpSocket::bind(local_addr).await?;
        socket.connect(peer_addr).await?;
        tracing::info!(%connection_id, %local_addr, %peer_addr, "connection opened");

        Ok(Self {
            socket,
            streams: Mutex::new(BTreeMap::new()),
            connection_id,
            config,
            send_pn: AtomicU64::new(0),
            recv_pn: AtomicU64::new(0),
            round_robin_cursor: Mutex::new(0),
            stats: Mutex::new(ConnectionStats::new()),
        })
    }

    pub fn local_addr(&self) -> QuicResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn open_stream(&self, stream_id: u64, role: Role) -> QuicResult<()> {
        let mut streams = self.streams.lock().await;
        if streams.len() >= self.config.max_streams && !streams.contains_key(&stream_id) {
            return Err(QuicError::TooManyStreams {
                max_streams: self.config.max_streams,
            });
        }
        streams
            .entry(stream_id)
            .or_insert_with(|| Stream::open(stream_id, role));
        tracing::info!(stream_id, ?role, "stream opened");
        Ok(())
    }

    pub async fn write(&self, stream_id: u64, bytes: &[u8]) -> QuicResult<()> {
        let mut streams = self.streams.lock().await;
        let stream = streams
            .get_mut(&stream_id)
            .ok_or(QuicError::UnknownStream(stream_id))?;
        let result = stream.write(bytes);
        if result.is_err() {
            stream.mark_failed();
        }
        result
    }

    pub async fn finish(&self, stream_id: u64) -> QuicResult<()> {
        let mut streams = self.streams.lock().await;
        let stream = streams
            .get_mut(&stream_id)
            .ok_or(QuicError::UnknownStream(stream_id))?;
        let result = stream.finish();
        if result.is_err() {
            stream.mark_failed();
        }
        result
    }

    /// Drain whatever in-order bytes are ready on `stream_id`. Returns an
    /// empty vec (rather than erroring) if nothing is ready yet; errors
    /// only if the stream id has never been seen.
    pub async fn poll_read(&self, stream_id: u64) -> QuicResult<Vec<u8>> {
        let mut streams = self.streams.lock().await;
        let stream = streams
            .get_mut(&stream_id)
            .ok_or(QuicError::UnknownStream(stream_id))?;
        Ok(stream.read_available())
    }

    pub async fn is_stream_terminal(&self, stream_id: u64) -> QuicResult<bool> {
        let streams = self.streams.lock().await;
        let stream = streams
            .get(&stream_id)
            .ok_or(QuicError::UnknownStream(stream_id))?;
        Ok(stream.is_terminal())
    }

    pub async fn all_streams_terminal(&self) -> bool {
        let streams = self.streams.lock().await;
        !streams.is_empty() && streams.values().all(Stream::is_terminal)
    }

    /// One pass of the send scheduler: pack whatever ready streams have to
    /// offer into a single packet and transmit it. Returns the number of
    /// bytes written to the socket, or 0 if nothing was ready to send.
    pub async fn send_once(&self) -> QuicResult<usize> {
        let mut streams = self.streams.lock().await;
        if streams.is_empty() {
            return Ok(0);
        }

        let pn = self.send_pn.fetch_add(1, Ordering::SeqCst) + 1;
        let header = PacketHeader::new(pn, self.connection_id);
        let mut packet = Packet::new(header);
        let mut remaining = self.config.max_packet_size.saturating_sub(HEADER_SIZE);

        let ids: Vec<u64> = streams.keys().copied().collect();
        let cursor = *self.round_robin_cursor.lock().await;
        let start = ids.iter().position(|&id| id >= cursor).unwrap_or(0);

        let mut last_offered = None;
        for offset in 0..ids.len() {
            if remaining < self.config.min_useful_remaining() {
                break;
            }
            let id = ids[(start + offset) % ids.len()];
            let Some(stream) = streams.get_mut(&id) else {
                continue;
            };
            if !stream.has_data_to_send() {
                continue;
            }

            let max_payload = remaining.saturating_sub(FRAME_HEADER_SIZE);
            match stream.next_frame(max_payload) {
                Ok(Some(frame)) => {
                    remaining -= frame.encoded_len();
                    last_offered = Some(id);
                    packet.frames.push(frame);
                }
                Ok(None) => {}
                // Packing-level condition, not a stream invariant violation:
                // this pass's packet just doesn't have room left for this
                // stream's next chunk. Per spec §7 the frame is skipped for
                // this pass, not dropped from scheduling — retry next pass.
                Err(QuicError::FrameTooSmall { .. }) => {
                    tracing::trace!(stream_id = id, "no room left in this packet for stream, retrying next pass");
                }
                Err(err) => {
                    tracing::warn!(stream_id = id, error = %err, "stream invariant violated, excluding from scheduling");
                    stream.mark_failed();
                }
            }
        }

        if let Some(id) = last_offered {
            *self.round_robin_cursor.lock().await = id.wrapping_add(1);
        }

        if packet.is_empty() {
            return Ok(0);
        }

        let bytes = packet.encode(self.config.max_packet_size)?;
        self.socket.send(&bytes).await?;
        self.stats.lock().await.record_sent(bytes.len());
        tracing::debug!(packet_number = pn, frames = packet.frames.len(), bytes = bytes.len(), "packet sent");
        Ok(bytes.len())
    }

    /// One pass of the receive dispatcher: block (up to the configured
    /// timeout) for a datagram, parse it, and route each frame to its
    /// stream, auto-creating a receive-only half for unknown ids. Parse
    /// failures drop the whole datagram and are counted, never propagated.
    pub async fn recv_once(&self) -> QuicResult<()> {
        let mut buf = vec![0u8; self.config.max_packet_size];
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let read = match tokio::time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(err)) => return Err(QuicError::Socket(err)),
            Err(_) => {
                return Err(QuicError::Socket(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "receive timed out",
                )))
            }
        };
        buf.truncate(read);

        match Packet::decode(&buf) {
            Ok(packet) => {
                self.recv_pn.store(packet.header.packet_number, Ordering::SeqCst);
                let mut streams = self.streams.lock().await;
                for frame in packet.frames {
                    let stream = streams
                        .entry(frame.stream_id)
                        .or_insert_with(|| Stream::new_receive_only(frame.stream_id));
                    if let Err(err) = stream.deliver(frame) {
                        tracing::warn!(error = %err, "stream invariant violated on receive, stream marked failed");
                        stream.mark_failed();
                    }
                }
                self.stats.lock().await.record_received(read);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed datagram");
                self.stats.lock().await.record_dropped();
                Ok(())
            }
        }
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.stats.lock().await.snapshot()
    }

    pub async fn close(&self) -> QuicResult<()> {
        tracing::info!(connection_id = %self.connection_id, "connection closed");
        Ok(())
    }
}
