//! Sockets UDP SSDP liés à une interface.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use pmoutils::NetInterface;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, warn};

use super::{MAX_PACKET_SIZE, SSDP_MULTICAST_ADDR, SSDP_PORT};

#[derive(Debug, Error)]
pub enum SsdpError {
    #[error("failed to bind SSDP socket on {interface}: {source}")]
    Bind {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("SSDP socket I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no usable network interface: {0}")]
    NoInterface(io::Error),

    #[error("SSDP server is not running")]
    Closed,

    #[error("SSDP receive thread panicked")]
    ThreadPanicked,
}

/// Socket UDP SSDP attaché à une interface réseau.
#[derive(Debug)]
pub struct SsdpSocket {
    socket: UdpSocket,
    interface: NetInterface,
}

fn multicast_group() -> Ipv4Addr {
    SSDP_MULTICAST_ADDR
        .parse()
        .unwrap_or(Ipv4Addr::new(239, 255, 255, 250))
}

fn new_udp_socket(interface: &NetInterface) -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        warn!("Failed to set SO_REUSEPORT on {}: {}", interface, e);
    }

    Ok(socket)
}

fn configure_multicast_output(socket: &Socket, interface: &NetInterface, ttl: u32) {
    if let Err(e) = socket.set_multicast_if_v4(&interface.address) {
        warn!("Failed to set multicast interface {}: {}", interface, e);
    }
    if let Err(e) = socket.set_multicast_ttl_v4(ttl) {
        warn!("Failed to set multicast TTL on {}: {}", interface, e);
    }
    if let Err(e) = socket.set_multicast_loop_v4(true) {
        warn!("Failed to enable multicast loop on {}: {}", interface, e);
    }
}

impl SsdpSocket {
    /// Socket rejoignant le groupe `239.255.255.250:1900` sur `interface`.
    pub fn multicast(
        interface: &NetInterface,
        ttl: u32,
        read_timeout: Duration,
    ) -> Result<Self, SsdpError> {
        let bind_err = |source| SsdpError::Bind {
            interface: interface.to_string(),
            source,
        };

        let socket = new_udp_socket(interface).map_err(bind_err)?;
        let group = multicast_group();

        #[cfg(unix)]
        let bind_addr = SocketAddrV4::new(group, SSDP_PORT);
        #[cfg(not(unix))]
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT);

        socket
            .bind(&SocketAddr::V4(bind_addr).into())
            .map_err(bind_err)?;
        socket
            .join_multicast_v4(&group, &interface.address)
            .map_err(bind_err)?;
        configure_multicast_output(&socket, interface, ttl);
        socket
            .set_read_timeout(Some(read_timeout))
            .map_err(bind_err)?;

        debug!("SSDP: joined {} on {}", SSDP_MULTICAST_ADDR, interface);

        Ok(Self {
            socket: socket.into(),
            interface: interface.clone(),
        })
    }

    /// Socket lié à `interface.address:port` (0 pour un port éphémère).
    pub fn unicast(
        interface: &NetInterface,
        port: u16,
        ttl: u32,
        read_timeout: Duration,
    ) -> Result<Self, SsdpError> {
        let bind_err = |source| SsdpError::Bind {
            interface: interface.to_string(),
            source,
        };

        let socket = new_udp_socket(interface).map_err(bind_err)?;
        let bind_addr = SocketAddrV4::new(interface.address, port);
        socket
            .bind(&SocketAddr::V4(bind_addr).into())
            .map_err(bind_err)?;
        configure_multicast_output(&socket, interface, ttl);
        socket
            .set_read_timeout(Some(read_timeout))
            .map_err(bind_err)?;

        Ok(Self {
            socket: socket.into(),
            interface: interface.clone(),
        })
    }

    pub fn interface(&self) -> &NetInterface {
        &self.interface
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(bytes, addr)
    }

    /// Envoie un datagramme vers le groupe multicast SSDP.
    pub fn send_multicast(&self, bytes: &[u8]) -> io::Result<usize> {
        let addr = SocketAddr::V4(SocketAddrV4::new(multicast_group(), SSDP_PORT));
        self.socket.send_to(bytes, addr)
    }

    /// Attend un datagramme pendant au plus le délai de lecture.
    ///
    /// Retourne `Ok(None)` à l'expiration du délai.
    pub fn recv(&self) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        match self.socket.recv_from(&mut buf) {
            Ok((n, from)) => Ok(Some((buf[..n].to_vec(), from))),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
