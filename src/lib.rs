//! A simplified QUIC-style datagram transport: STREAM-frame framing, a
//! per-stream send/receive reassembly engine, and a connection multiplexer
//! over a single UDP flow. Not wire-compatible with real QUIC — no TLS, no
//! congestion control, no loss recovery, no varints.

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod header;
pub mod packet;
pub mod stats;
pub mod stream;

pub use config::QuicConfig;
pub use connection::QuicConnection;
pub use error::{QuicError, QuicResult};
pub use frame::StreamFrame;
pub use header::{ConnectionId, PacketHeader};
pub use packet::Packet;
pub use stats::StatsSnapshot;
pub use stream::{Direction, Role, Stream};
