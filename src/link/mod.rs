pub mod protocol;

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::Context;
use tracing::{debug, info, trace};

use protocol::ControlPacket;

/// Resolve the arm controller's hostname once at startup
///
/// IPv4 addresses are preferred when the resolver returns both families.
pub fn resolve_destination(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("could not resolve host {}", host))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no addresses found for host {}", host))
}

/// Send-only datagram channel to a fixed destination
///
/// Shared by the keep-alive ticker and the command dispatcher. Each send
/// is one complete 7-byte datagram, so concurrent senders need no lock.
#[derive(Debug)]
pub struct Link {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl Link {
    /// Open a UDP socket on an ephemeral port of the destination's family
    pub fn open(destination: SocketAddr) -> anyhow::Result<Self> {
        let bind: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind).context("could not open socket")?;
        Ok(Self::from_socket(socket, destination))
    }

    /// Wrap an already bound socket
    pub fn from_socket(socket: UdpSocket, destination: SocketAddr) -> Self {
        if let Ok(local) = socket.local_addr() {
            info!("Link {} -> {}", local, destination);
        }
        Self {
            socket,
            destination,
        }
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Encode and send one packet to the destination
    pub fn send(&self, packet: &ControlPacket) -> io::Result<()> {
        let wire = packet.encode();
        trace!("-> {} [{}]", self.destination, hex::encode(wire));

        let sent = self.socket.send_to(&wire, self.destination)?;
        if sent != wire.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {} of {} bytes", sent, wire.len()),
            ));
        }

        debug!("Sent {} to {}", packet, self.destination);
        Ok(())
    }
}
