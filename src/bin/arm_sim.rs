//! Arm Controller Simulator
//!
//! Plays the robot-arm side of the GCS link: listens for `GCS` packets,
//! prints each one, and reports when keep-alives stop arriving. Useful for
//! exercising the station without the arm.
//!
//! Usage: cargo run --bin arm-sim -- [bind_addr] [--link-timeout-ms N]

use std::net::SocketAddr;

use bytes::Buf;
use clap::Parser;
use tokio::net::UdpSocket;
use tokio::time::{timeout, Duration, Instant};

const HEADER: &[u8; 3] = b"GCS";
const PACKET_LEN: usize = 7;

#[derive(Parser)]
#[command(name = "arm-sim")]
#[command(about = "Simulated arm controller that prints received GCS packets")]
struct Cli {
    /// Address to listen on
    #[arg(default_value = "0.0.0.0:9000")]
    bind: SocketAddr,

    /// Report link loss after this long without any packet
    #[arg(long, default_value_t = 1000)]
    link_timeout_ms: u64,
}

/// A decoded datagram from the station
#[derive(Debug, PartialEq, Eq)]
enum Received {
    KeepAlive,
    Terminate,
    Command(i32),
}

fn parse(data: &[u8]) -> anyhow::Result<Received> {
    if data.len() != PACKET_LEN {
        return Err(anyhow::anyhow!(
            "Expected {} bytes, got {}",
            PACKET_LEN,
            data.len()
        ));
    }

    let mut buf = data;
    let mut header = [0u8; 3];
    buf.copy_to_slice(&mut header);
    if &header != HEADER {
        return Err(anyhow::anyhow!("Bad header: {}", hex::encode(header)));
    }

    Ok(match buf.get_i32_le() {
        0 => Received::KeepAlive,
        -1 => Received::Terminate,
        code => Received::Command(code),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let link_timeout = Duration::from_millis(cli.link_timeout_ms);

    println!("🦾 Arm Controller Simulator");
    println!("  Listening: {}", cli.bind);
    println!("  Link timeout: {:?}", link_timeout);
    println!();

    let socket = UdpSocket::bind(cli.bind).await?;

    tokio::select! {
        result = receive_loop(&socket, link_timeout) => result?,
        _ = tokio::signal::ctrl_c() => println!("\nStopping simulator"),
    }

    Ok(())
}

async fn receive_loop(socket: &UdpSocket, link_timeout: Duration) -> anyhow::Result<()> {
    let mut buf = [0u8; 64];
    let mut last_seen: Option<Instant> = None;
    let mut link_up = false;
    let mut keep_alives: u64 = 0;

    loop {
        match timeout(link_timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => {
                let now = Instant::now();
                if !link_up {
                    println!("✅ Link up from {}", from);
                    link_up = true;
                }

                match parse(&buf[..len]) {
                    Ok(Received::KeepAlive) => {
                        keep_alives += 1;
                        let gap = last_seen.map(|t| now.duration_since(t));
                        println!("   keep-alive #{} (gap {:?})", keep_alives, gap);
                    }
                    Ok(Received::Terminate) => println!("🛑 Termination from {}", from),
                    Ok(Received::Command(code)) => println!("📥 Code {} from {}", code, from),
                    Err(e) => println!("⚠️  Malformed packet from {}: {}", from, e),
                }
                last_seen = Some(now);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                if link_up {
                    println!("❌ Link lost: nothing received for {:?}", link_timeout);
                    link_up = false;
                }
            }
        }
    }
}
