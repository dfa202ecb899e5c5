//! UDP multicast bus for tabs running as separate processes.
//!
//! Every process joins one multicast group with multicast loopback enabled
//! and a TTL of 0, so datagrams never leave the machine. Each datagram is a
//! JSON [`Envelope`]; receivers drop their own looped-back copies by origin.
//!
//! Delivery is whatever UDP gives: unordered, lossy, at-most-once. That
//! matches the bus contract the engine expects.
//!
//! Non-waiting sends and reads go straight to the OS through a cloned std
//! socket. Tokio's `try_*` calls report `WouldBlock` until the reactor has
//! seen the socket, which would lose the startup announcement.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use favletters_core::{Inbox, Message, Transport};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

use crate::types::{decode_datagram, new_origin, Envelope, Origin, MAX_DATAGRAM};

/// Default multicast group ("FV" in the last two octets).
pub const DEFAULT_GROUP: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(239, 255, 70, 86), 47086);

/// Bus configuration
#[derive(Debug, Clone)]
pub struct UdpBusConfig {
    /// Multicast group and port shared by every tab
    pub group: SocketAddrV4,
    /// Local interface to join on (UNSPECIFIED lets the kernel pick)
    pub interface: Ipv4Addr,
    /// Receive buffer size in bytes
    pub rcvbuf: usize,
}

impl Default for UdpBusConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP,
            interface: Ipv4Addr::UNSPECIFIED,
            rcvbuf: 1024 * 1024, // 1MB
        }
    }
}

/// One process's attachment to the multicast bus.
#[derive(Debug, Clone)]
pub struct UdpBus {
    socket: Arc<UdpSocket>,
    raw: Arc<std::net::UdpSocket>,
    group: SocketAddr,
    origin: Origin,
}

impl UdpBus {
    /// Join the group. Must be called from within a tokio runtime.
    pub async fn bind(cfg: UdpBusConfig) -> anyhow::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        // Every tab binds the same port
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_recv_buffer_size(cfg.rcvbuf)?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, cfg.group.port());
        socket.bind(&SocketAddr::V4(bind_addr).into())?;

        socket.join_multicast_v4(cfg.group.ip(), &cfg.interface)?;
        socket.set_multicast_loop_v4(true)?;
        socket.set_multicast_ttl_v4(0)?;
        if !cfg.interface.is_unspecified() {
            socket.set_multicast_if_v4(&cfg.interface)?;
        }
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let raw = std_socket.try_clone()?;
        let tokio_socket = UdpSocket::from_std(std_socket)?;
        let origin = new_origin();

        info!(
            "UDP bus joined {} on {} (origin={}, rcvbuf={})",
            cfg.group, cfg.interface, origin, cfg.rcvbuf
        );

        Ok(Self {
            socket: Arc::new(tokio_socket),
            raw: Arc::new(raw),
            group: SocketAddr::V4(cfg.group),
            origin,
        })
    }

    /// This bus instance's origin token.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The multicast group datagrams are sent to.
    pub fn group(&self) -> SocketAddr {
        self.group
    }
}

impl Transport for UdpBus {
    type Inbox = UdpInbox;

    fn publish(&self, message: &Message) -> favletters_core::Result<()> {
        let bytes = Envelope::new(self.origin.clone(), message.clone()).to_bytes()?;

        match self.raw.send_to(&bytes, self.group) {
            Ok(_) => {
                trace!(kind = message.kind(), len = bytes.len(), "published");
                Ok(())
            }
            // Best-effort: a full send buffer is just a lost message
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!(kind = message.kind(), "send buffer full, message dropped");
                Ok(())
            }
            Err(e) => Err(favletters_core::Error::Transport(e.to_string())),
        }
    }

    /// Hand out the receive side. Datagrams are split between inboxes, so
    /// take exactly one per bus.
    fn subscribe(&self) -> favletters_core::Result<UdpInbox> {
        Ok(UdpInbox {
            socket: Arc::clone(&self.socket),
            raw: Arc::clone(&self.raw),
            origin: self.origin.clone(),
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }
}

/// Messages from other processes on the multicast bus.
pub struct UdpInbox {
    socket: Arc<UdpSocket>,
    raw: Arc<std::net::UdpSocket>,
    origin: Origin,
    buf: Vec<u8>,
}

impl Inbox for UdpInbox {
    fn try_next(&mut self) -> Option<Message> {
        loop {
            match self.raw.recv_from(&mut self.buf) {
                Ok((len, _from)) => {
                    if let Some(message) = decode_datagram(&self.origin, &self.buf[..len]) {
                        return Some(message);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) if is_transient(&e) => {}
                Err(e) => {
                    warn!("UDP receive error: {}", e);
                    return None;
                }
            }
        }
    }

    async fn next(&mut self) -> Option<Message> {
        loop {
            match self.socket.recv_from(&mut self.buf).await {
                Ok((len, from)) => {
                    if let Some(message) = decode_datagram(&self.origin, &self.buf[..len]) {
                        trace!(kind = message.kind(), %from, "received");
                        return Some(message);
                    }
                }
                Err(e) if is_transient(&e) => trace!(error = %e, "transient receive error"),
                Err(e) => {
                    warn!("UDP receive failed, closing inbox: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Errors after which the socket is still usable (ICMP reports, signals).
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
