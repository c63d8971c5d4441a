//! Reference sender driver (SPEC_FULL §5): opens a file, streams it over a
//! single stream, sends a FIN, and prints throughput stats. All framing and
//! session logic lives in the `miniquic` library; this binary only does
//! file I/O, argument parsing, and stats formatting.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use miniquic::config::{PORT_RECEIVER, PORT_SENDER};
use miniquic::{ConnectionId, QuicConfig, QuicConnection, Role};

const READ_CHUNK: usize = 16 * 1024;
// Unidirectional (bit 1 set): this endpoint only ever opens the sender
// half, so `is_terminal` doesn't wait on a receiver half that will never
// see any frames.
const STREAM_ID: u64 = 2;

#[derive(Parser, Debug)]
#[command(about = "Stream a file to a miniquic receiver over one stream")]
struct Args {
    /// File to send.
    #[arg(long)]
    file: PathBuf,

    /// Local UDP address to bind.
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], PORT_SENDER)))]
    local: SocketAddr,

    /// Peer (receiver) UDP address.
    #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], PORT_RECEIVER)))]
    peer: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let connection = QuicConnection::new(
        ConnectionId::new([0xc1, 0xe5, 0x51, 0x0a, 0, 0, 0, 1]),
        args.local,
        args.peer,
        QuicConfig::default(),
    )
    .await?;

    connection.open_stream(STREAM_ID, Role::Sender).await?;

    let mut file = File::open(&args.file).await?;
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        connection.write(STREAM_ID, &buf[..read]).await?;
        while connection.send_once().await? > 0 {}
    }
    connection.finish(STREAM_ID).await?;
    while !connection.is_stream_terminal(STREAM_ID).await? {
        connection.send_once().await?;
    }

    let stats = connection.stats().await;
    println!(
        "sent {} bytes in {} packets over {:.2}s ({:.0} B/s, {:.1} pkt/s)",
        stats.bytes_sent,
        stats.packets_sent,
        stats.elapsed_secs,
        stats.byte_rate(),
        stats.packet_rate(),
    );

    connection.close().await?;
    Ok(())
}
