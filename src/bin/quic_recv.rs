//! Reference receiver driver (SPEC_FULL §5): binds, loops on socket reads
//! until the configured timeout signals end-of-connection, writes the
//! reassembled stream to a file, and prints throughput stats.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use miniquic::config::{PORT_RECEIVER, PORT_SENDER};
use miniquic::{ConnectionId, QuicConfig, QuicConnection, QuicError};

// Matches the unidirectional id quic_send opens; the receive dispatcher
// auto-creates a receiver-only half for it regardless.
const STREAM_ID: u64 = 2;

#[derive(Parser, Debug)]
#[command(about = "Receive a file streamed by a miniquic sender")]
struct Args {
    /// File to write the reassembled stream into.
    #[arg(long)]
    out: PathBuf,

    /// Local UDP address to bind.
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], PORT_RECEIVER)))]
    local: SocketAddr,

    /// Peer (sender) UDP address.
    #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], PORT_SENDER)))]
    peer: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let connection = QuicConnection::new(
        ConnectionId::new([0xc1, 0xe5, 0x51, 0x0a, 0, 0, 0, 2]),
        args.local,
        args.peer,
        QuicConfig::default(),
    )
    .await?;

    let mut out = File::create(&args.out).await?;

    loop {
        match connection.recv_once().await {
            Ok(()) => {
                let bytes = connection.poll_read(STREAM_ID).await.unwrap_or_default();
                if !bytes.is_empty() {
                    out.write_all(&bytes).await?;
                }
                if connection.is_stream_terminal(STREAM_ID).await.unwrap_or(false) {
                    break;
                }
            }
            Err(QuicError::Socket(err)) if err.kind() == std::io::ErrorKind::TimedOut => {
                tracing::info!("receive timed out, treating as end of connection");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    let stats = connection.stats().await;
    println!(
        "received {} bytes in {} packets over {:.2}s ({:.0} B/s, {:.1} pkt/s), {} datagrams dropped",
        stats.bytes_received,
        stats.packets_received,
        stats.elapsed_secs,
        stats.byte_rate(),
        stats.packet_rate(),
        stats.datagrams_dropped,
    );

    connection.close().await?;
    Ok(())
}
