//! Serveurs SSDP : une tâche de réception par socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pmoutils::NetInterface;
use tracing::{debug, info, trace, warn};

use super::{Packet, Request, Response, SsdpError, SsdpSocket};
use crate::logging::Logger;

/// Callbacks des messages reçus sur le groupe multicast.
pub trait MulticastListener: Send + Sync {
    fn device_notify_received(&self, _request: &Request) {}
    fn device_search_received(&self, _request: &Request) {}
}

/// Callbacks des réponses unicast aux M-SEARCH.
pub trait UnicastListener: Send + Sync {
    fn device_response_received(&self, _response: &Response) {}
}

/// Socket + thread de réception + drapeau d'arrêt.
#[derive(Debug)]
struct Receiver {
    socket: Arc<SsdpSocket>,
    closed: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Receiver {
    fn spawn<F>(name: &str, socket: SsdpSocket, logger: Logger, handle: F) -> Result<Self, SsdpError>
    where
        F: Fn(Packet) + Send + 'static,
    {
        let socket = Arc::new(socket);
        let closed = Arc::new(AtomicBool::new(false));

        let thread = {
            let socket = Arc::clone(&socket);
            let closed = Arc::clone(&closed);
            thread::Builder::new()
                .name(format!("{}-{}", name, socket.interface().name))
                .spawn(move || {
                    let _guard = logger.enter();
                    receive_loop(&socket, &closed, handle);
                })?
        };

        Ok(Self {
            socket,
            closed,
            thread: Some(thread),
        })
    }

    fn stop(&mut self) -> Result<(), SsdpError> {
        self.closed.store(true, Ordering::SeqCst);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| SsdpError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn receive_loop<F>(socket: &SsdpSocket, closed: &AtomicBool, handle: F)
where
    F: Fn(Packet),
{
    let interface = socket.interface().clone();
    while !closed.load(Ordering::SeqCst) {
        match socket.recv() {
            Ok(Some((bytes, from))) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                match Packet::parse(&bytes) {
                    Ok(mut packet) => {
                        packet.set_from(from);
                        packet.set_interface(interface.clone());
                        trace!("📥 SSDP packet from {} on {}\n{}", from, interface, packet);
                        handle(packet);
                    }
                    Err(e) => {
                        warn!("❌ Dropping malformed SSDP packet from {}: {}", from, e);
                    }
                }
            }
            Ok(None) => continue,
            Err(e) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                warn!("❌ SSDP read error on {}: {}", interface, e);
            }
        }
    }
    debug!("SSDP receiver on {} stopped", interface);
}

/// Serveur multicast sur une interface : reçoit NOTIFY et M-SEARCH.
pub struct MulticastServer {
    listener: Option<Arc<dyn MulticastListener>>,
    logger: Logger,
    receiver: Option<Receiver>,
}

impl MulticastServer {
    pub fn new(listener: Option<Arc<dyn MulticastListener>>, logger: Logger) -> Self {
        Self {
            listener,
            logger,
            receiver: None,
        }
    }

    pub fn start(
        &mut self,
        interface: &NetInterface,
        ttl: u32,
        read_timeout: Duration,
    ) -> Result<(), SsdpError> {
        self.stop()?;

        let socket = SsdpSocket::multicast(interface, ttl, read_timeout)?;
        let listener = self.listener.clone();
        let receiver = Receiver::spawn("ssdp-mcast", socket, self.logger.clone(), move |packet| {
            let request = Request::from(packet);
            let Some(listener) = listener.as_deref() else {
                return;
            };
            if request.is_notify() {
                listener.device_notify_received(&request);
            } else if request.is_search() {
                listener.device_search_received(&request);
            } else {
                trace!("Ignoring SSDP message {:?}", request.first_line());
            }
        })?;

        info!("✅ SSDP multicast server started on {}", interface);
        self.receiver = Some(receiver);
        Ok(())
    }

    /// Arrête le serveur ; sans effet s'il n'est pas démarré.
    pub fn stop(&mut self) -> Result<(), SsdpError> {
        match self.receiver.take() {
            Some(mut receiver) => receiver.stop(),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn interface(&self) -> Option<&NetInterface> {
        self.receiver.as_ref().map(|r| r.socket.interface())
    }
}

/// Serveur unicast sur une interface : émet les M-SEARCH et reçoit les
/// réponses 200 OK.
pub struct UnicastServer {
    listener: Option<Arc<dyn UnicastListener>>,
    logger: Logger,
    receiver: Option<Receiver>,
}

impl UnicastServer {
    pub fn new(listener: Option<Arc<dyn UnicastListener>>, logger: Logger) -> Self {
        Self {
            listener,
            logger,
            receiver: None,
        }
    }

    pub fn start(
        &mut self,
        interface: &NetInterface,
        port: u16,
        ttl: u32,
        read_timeout: Duration,
    ) -> Result<(), SsdpError> {
        self.stop()?;

        let socket = SsdpSocket::unicast(interface, port, ttl, read_timeout)?;
        let listener = self.listener.clone();
        let receiver = Receiver::spawn("ssdp-ucast", socket, self.logger.clone(), move |packet| {
            if let Some(listener) = listener.as_deref() {
                listener.device_response_received(&Response::from(packet));
            }
        })?;

        info!(
            "✅ SSDP unicast server started on {}:{}",
            interface.address,
            receiver.socket.local_addr().map(|a| a.port()).unwrap_or(port)
        );
        self.receiver = Some(receiver);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), SsdpError> {
        match self.receiver.take() {
            Some(mut receiver) => receiver.stop(),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn interface(&self) -> Option<&NetInterface> {
        self.receiver.as_ref().map(|r| r.socket.interface())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().and_then(|r| r.socket.local_addr().ok())
    }

    /// Envoie `request` vers le groupe multicast depuis ce socket.
    pub fn send_multicast(&self, request: &Request) -> Result<(), SsdpError> {
        let receiver = self.receiver.as_ref().ok_or(SsdpError::Closed)?;
        receiver.socket.send_multicast(&request.to_bytes())?;
        debug!(
            "📤 SSDP request sent from {}\n{}",
            receiver.socket.interface(),
            request.packet()
        );
        Ok(())
    }

    /// Envoie `packet` vers `addr` depuis ce socket.
    pub fn send_to(&self, packet: &Packet, addr: SocketAddr) -> Result<(), SsdpError> {
        let receiver = self.receiver.as_ref().ok_or(SsdpError::Closed)?;
        receiver.socket.send_to(&packet.to_bytes(), addr)?;
        Ok(())
    }

    /// Envoie un M-SEARCH pour la cible `st`.
    pub fn search(&self, st: &str, mx: u32) -> Result<(), SsdpError> {
        let request = Request::new_search(st, mx);
        self.send_multicast(&request)?;
        info!("📤 M-SEARCH sent (ST={}, MX={})", st, mx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, UdpSocket};
    use std::sync::mpsc;

    struct Collector(parking_lot::Mutex<mpsc::Sender<Response>>);

    impl UnicastListener for Collector {
        fn device_response_received(&self, response: &Response) {
            let _ = self.0.lock().send(response.clone());
        }
    }

    fn loopback() -> NetInterface {
        NetInterface::new("lo", Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn test_unicast_server_receives_response() {
        let (tx, rx) = mpsc::channel();
        let listener: Arc<dyn UnicastListener> = Arc::new(Collector(parking_lot::Mutex::new(tx)));
        let mut server = UnicastServer::new(Some(listener), Logger::none());
        server
            .start(&loopback(), 0, 4, Duration::from_millis(50))
            .unwrap();
        let addr = server.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"garbage", addr).unwrap();
        sender
            .send_to(
                b"HTTP/1.1 200 OK\r\nST: upnp:rootdevice\r\nLOCATION: http://127.0.0.1:1/d.xml\r\n\r\n",
                addr,
            )
            .unwrap();

        let response = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.location(), Some("http://127.0.0.1:1/d.xml"));
        assert_eq!(response.from(), Some(sender.local_addr().unwrap()));
        assert_eq!(response.interface(), Some(&loopback()));

        server.stop().unwrap();
        assert!(!server.is_running());
        server.stop().unwrap();
    }

    #[test]
    fn test_send_requires_running_server() {
        let server = UnicastServer::new(None, Logger::none());
        assert!(matches!(
            server.search("ssdp:all", 1),
            Err(SsdpError::Closed)
        ));
    }
}
